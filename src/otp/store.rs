//! OTP 记录存储
//!
//! 存储只是一个按 token 索引的容器，不包含任何业务规则；
//! 过期、次数和唯一性都由 [`super::OtpEngine`] 负责。

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::record::OtpRecord;
use crate::error::{Result, StorageError};

/// [`OtpStore::increment_if_unchanged`] 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// 已递增，返回新的验证次数
    Incremented { attempts: u32 },
    /// 存储中的记录与快照不一致，未修改
    Conflict,
    /// 记录不存在
    Missing,
}

/// OTP 存储接口
///
/// 实现此 trait 以提供自定义的存储后端（如 Redis、数据库等）
pub trait OtpStore: Send + Sync {
    /// 保存记录（覆盖同 token 的旧记录）
    fn save(&self, token: &str, record: OtpRecord) -> Result<()>;

    /// 获取记录
    fn get(&self, token: &str) -> Result<Option<OtpRecord>>;

    /// 获取全部记录（用于清理）
    fn get_all(&self) -> Result<HashMap<String, OtpRecord>>;

    /// 记录总数
    fn value_count(&self) -> Result<usize>;

    /// token 是否存在
    fn has(&self, token: &str) -> Result<bool>;

    /// 删除记录，记录不存在时不报错
    fn remove(&self, token: &str) -> Result<()>;

    /// 清空全部记录
    fn clear(&self) -> Result<()>;

    /// 原子地比较并递增验证次数
    ///
    /// 仅当存储中的记录与 `snapshot` 完全相同时才把 `validation_attempts` 加一。
    /// 读取与写入必须在同一个临界区内完成。
    fn increment_if_unchanged(
        &self,
        token: &str,
        snapshot: &OtpRecord,
    ) -> Result<IncrementOutcome>;
}

impl<S: OtpStore + ?Sized> OtpStore for Arc<S> {
    fn save(&self, token: &str, record: OtpRecord) -> Result<()> {
        (**self).save(token, record)
    }

    fn get(&self, token: &str) -> Result<Option<OtpRecord>> {
        (**self).get(token)
    }

    fn get_all(&self) -> Result<HashMap<String, OtpRecord>> {
        (**self).get_all()
    }

    fn value_count(&self) -> Result<usize> {
        (**self).value_count()
    }

    fn has(&self, token: &str) -> Result<bool> {
        (**self).has(token)
    }

    fn remove(&self, token: &str) -> Result<()> {
        (**self).remove(token)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn increment_if_unchanged(
        &self,
        token: &str,
        snapshot: &OtpRecord,
    ) -> Result<IncrementOutcome> {
        (**self).increment_if_unchanged(token, snapshot)
    }
}

// ============================================================================
// 内存存储实现
// ============================================================================

/// 内存存储实现
///
/// 适用于单实例部署或测试环境。克隆出的实例共享同一份数据。
/// 进程重启后数据丢失。
#[derive(Debug, Clone, Default)]
pub struct InMemoryOtpStore {
    /// token -> 记录
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
}

impl InMemoryOtpStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的记录数量
    pub fn len(&self) -> Result<usize> {
        self.value_count()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, OtpRecord>>> {
        self.records
            .read()
            .map_err(|_| StorageError::lock_poisoned().into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, OtpRecord>>> {
        self.records
            .write()
            .map_err(|_| StorageError::lock_poisoned().into())
    }
}

impl OtpStore for InMemoryOtpStore {
    fn save(&self, token: &str, record: OtpRecord) -> Result<()> {
        self.write()?.insert(token.to_string(), record);
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<OtpRecord>> {
        Ok(self.read()?.get(token).cloned())
    }

    fn get_all(&self) -> Result<HashMap<String, OtpRecord>> {
        Ok(self.read()?.clone())
    }

    fn value_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    fn has(&self, token: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(token))
    }

    fn remove(&self, token: &str) -> Result<()> {
        self.write()?.remove(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    fn increment_if_unchanged(
        &self,
        token: &str,
        snapshot: &OtpRecord,
    ) -> Result<IncrementOutcome> {
        let mut records = self.write()?;
        let Some(record) = records.get_mut(token) else {
            return Ok(IncrementOutcome::Missing);
        };

        if *record != *snapshot {
            return Ok(IncrementOutcome::Conflict);
        }

        record.validation_attempts += 1;
        Ok(IncrementOutcome::Incremented {
            attempts: record.validation_attempts,
        })
    }
}
