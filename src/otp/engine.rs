//! OTP 引擎
//!
//! 负责验证码的签发、验证、刷新、撤销和惰性过期。
//!
//! ## 并发模型
//!
//! - 一把互斥锁（签发区）保护熵源，以及所有“先检查后写入”的序列：
//!   token 唯一性搜索 + 写入、终态记录的删除、撤销、刷新、清空。
//! - `validate` 的读和写不在签发区内，而是依赖存储的
//!   [`OtpStore::increment_if_unchanged`]：只有记录仍与读到的快照一致时才递增，
//!   否则重新读取并重新判断。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::config::OtpConfig;
use super::record::{OtpRecord, RecordState};
use super::store::{IncrementOutcome, InMemoryOtpStore, OtpStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::random::{EntropySource, constant_time_compare_str};

// ============================================================================
// 数据结构
// ============================================================================

/// 签发结果
#[derive(Debug, Clone)]
pub struct IssuedCode {
    /// 发送给用户的验证码
    pub code: String,

    /// 标识本次验证的 token
    pub token: String,

    /// 过期时间（墙上时钟，仅供展示）
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    /// 获取剩余有效时间（秒）
    pub fn remaining_seconds(&self) -> i64 {
        let remaining = self.expires_at - Utc::now();
        remaining.num_seconds().max(0)
    }
}

/// 记录的只读状态视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordStatus {
    /// 逻辑状态（已考虑过期和次数）
    pub state: RecordState,

    /// 已成功验证的次数
    pub validation_attempts: u32,

    /// 剩余可成功验证的次数
    pub remaining_validations: u32,

    /// 剩余有效时间
    pub remaining_ttl: Duration,
}

// ============================================================================
// OTP 引擎
// ============================================================================

/// OTP 引擎
///
/// ## 示例
///
/// ```rust
/// use otprs::otp::{OtpConfig, OtpEngine};
/// use std::time::Duration;
///
/// let engine = OtpEngine::new(OtpConfig::standard()).unwrap();
///
/// // 签发
/// let issued = engine.new_code(Duration::from_secs(300), 1).unwrap();
/// assert_eq!(issued.code.len(), 6);
/// assert_eq!(issued.token.len(), 10);
///
/// // 验证
/// assert!(engine.validate(&issued.token, &issued.code).unwrap());
///
/// // 次数已用完
/// assert!(engine.validate(&issued.token, &issued.code).is_err());
/// assert!(!engine.exists(&issued.token).unwrap());
/// ```
pub struct OtpEngine<S: OtpStore = InMemoryOtpStore> {
    store: S,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    issuance: Mutex<EntropySource>,
}

impl OtpEngine<InMemoryOtpStore> {
    /// 使用内存存储创建引擎
    pub fn new(config: OtpConfig) -> Result<Self> {
        Self::with_store(InMemoryOtpStore::new(), config)
    }
}

impl<S: OtpStore> OtpEngine<S> {
    /// 使用自定义存储创建引擎
    ///
    /// 熵源在这里以系统时钟播种一次。
    pub fn with_store(store: S, config: OtpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            issuance: Mutex::new(EntropySource::from_clock()),
        })
    }

    /// 替换时钟
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// 替换熵源
    pub fn with_entropy(mut self, source: EntropySource) -> Self {
        self.issuance = Mutex::new(source);
        self
    }

    /// 获取配置
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// 获取存储
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------------
    // 签发
    // ------------------------------------------------------------------------

    /// 签发验证码并分配一个随机 token
    ///
    /// # Errors
    ///
    /// - `max_attempts` 为 0 或 `ttl` 为 0
    /// - 在重试次数内找不到空闲的 token（[`Error::RetriesExceeded`]）
    /// - 存储错误
    pub fn new_code(&self, ttl: Duration, max_attempts: u32) -> Result<IssuedCode> {
        let expires_in = issuance_window(ttl, max_attempts)?;

        let mut entropy = self.lock_issuance()?;
        let token = self.unique_token(&mut entropy)?;
        let code = entropy.code(self.config.code_length)?;
        let record = OtpRecord::new(&token, &code, self.clock.now(), ttl, max_attempts);
        self.store
            .save(&token, record)
            .inspect_err(store_fault("save", &token))?;
        drop(entropy);

        debug!(token = %token, ttl = ?ttl, max_attempts, "issued verification code");

        Ok(IssuedCode {
            code,
            token,
            expires_at: Utc::now() + expires_in,
        })
    }

    /// 使用调用方指定的 token 签发验证码
    ///
    /// 适用于把验证码绑定到调用方已有的会话 token 上，保证每个身份最多只有一个待验证的记录。
    /// 已过期或次数已用完但尚未清理的记录不算存活，会被直接替换。
    ///
    /// # Errors
    ///
    /// - token 已被存活的记录占用（[`Error::AlreadyExists`]）
    /// - token 为空、`max_attempts` 为 0 或 `ttl` 为 0
    pub fn new_code_with_assigned_token(
        &self,
        token: &str,
        ttl: Duration,
        max_attempts: u32,
    ) -> Result<String> {
        if token.is_empty() {
            return Err(Error::invalid_request("token must not be empty"));
        }
        issuance_window(ttl, max_attempts)?;

        let mut entropy = self.lock_issuance()?;
        let now = self.clock.now();
        if let Some(existing) = self.store.get(token).inspect_err(store_fault("get", token))? {
            if existing.state(now) == RecordState::Active {
                return Err(Error::AlreadyExists);
            }
            debug!(token = %token, state = ?existing.state(now), "replacing stale verification record");
        }

        let code = entropy.code(self.config.code_length)?;
        self.store
            .save(token, OtpRecord::new(token, &code, now, ttl, max_attempts))
            .inspect_err(store_fault("save", token))?;
        drop(entropy);

        debug!(token = %token, ttl = ?ttl, max_attempts, "issued verification code for assigned token");
        Ok(code)
    }

    /// 有界的 token 唯一性搜索
    fn unique_token(&self, entropy: &mut EntropySource) -> Result<String> {
        let budget = self.config.retry_budget;
        for _ in 0..budget {
            let candidate = entropy.token(self.config.token_length)?;
            let taken = self
                .store
                .has(&candidate)
                .inspect_err(store_fault("has", &candidate))?;
            if !taken {
                return Ok(candidate);
            }
        }

        warn!(
            attempts = budget,
            token_length = self.config.token_length,
            "token space exhausted while issuing verification code"
        );
        Err(Error::RetriesExceeded { attempts: budget })
    }

    // ------------------------------------------------------------------------
    // 生命周期
    // ------------------------------------------------------------------------

    /// 重置验证次数并把创建时间更新为当前时刻
    ///
    /// # Errors
    ///
    /// - 记录不存在（[`Error::NotFound`]）
    pub fn refresh(&self, token: &str) -> Result<()> {
        let _guard = self.lock_issuance()?;
        let record = self
            .store
            .get(token)
            .inspect_err(store_fault("get", token))?
            .ok_or(Error::NotFound)?;
        self.store
            .save(token, record.refreshed(self.clock.now()))
            .inspect_err(store_fault("save", token))?;

        debug!(token = %token, "refreshed verification record");
        Ok(())
    }

    /// 撤销记录，记录不存在时不报错
    pub fn cancel(&self, token: &str) -> Result<()> {
        let _guard = self.lock_issuance()?;
        self.store
            .remove(token)
            .inspect_err(store_fault("remove", token))
    }

    /// token 是否存在
    ///
    /// 只检查存在性，**不**判断过期和次数：已过期但尚未清理的记录仍返回 `true`。
    /// 需要逻辑状态时使用 [`Self::inspect`]。
    pub fn exists(&self, token: &str) -> Result<bool> {
        self.store.has(token)
    }

    /// 查看记录的逻辑状态，不做任何修改
    pub fn inspect(&self, token: &str) -> Result<Option<RecordStatus>> {
        let now = self.clock.now();
        Ok(self.store.get(token)?.map(|record| RecordStatus {
            state: record.state(now),
            validation_attempts: record.validation_attempts,
            remaining_validations: record.remaining_validations(),
            remaining_ttl: record.remaining_ttl(now),
        }))
    }

    // ------------------------------------------------------------------------
    // 验证
    // ------------------------------------------------------------------------

    /// 验证用户提交的验证码
    ///
    /// - 验证码正确：验证次数加一，返回 `Ok(true)`
    /// - 验证码错误：返回 `Ok(false)`，记录**不做任何修改**，错误的猜测不消耗次数
    ///
    /// # Errors
    ///
    /// - 记录不存在（[`Error::NotFound`]）
    /// - 次数已用完（[`Error::AttemptsExceeded`]，记录被删除）
    /// - 已过期（[`Error::Expired`]，记录被删除）
    /// - 与并发写入冲突的次数超过重试预算（[`Error::Internal`]）
    /// - 存储错误，原样返回，不重试
    pub fn validate(&self, token: &str, code: &str) -> Result<bool> {
        let budget = self.config.retry_budget;
        for _ in 0..budget {
            let record = self
                .store
                .get(token)
                .inspect_err(store_fault("get", token))?
                .ok_or(Error::NotFound)?;

            match record.state(self.clock.now()) {
                RecordState::Exhausted => {
                    self.remove_if_terminal(token)
                        .inspect_err(store_fault("remove", token))?;
                    debug!(token = %token, "validation attempts exceeded");
                    return Err(Error::AttemptsExceeded);
                }
                RecordState::Expired => {
                    self.remove_if_terminal(token)
                        .inspect_err(store_fault("remove", token))?;
                    debug!(token = %token, "verification code expired");
                    return Err(Error::Expired);
                }
                RecordState::Active => {}
            }

            if !constant_time_compare_str(code, &record.code) {
                debug!(token = %token, "verification code mismatch");
                return Ok(false);
            }

            let outcome = self
                .store
                .increment_if_unchanged(token, &record)
                .inspect_err(store_fault("increment", token))?;
            match outcome {
                IncrementOutcome::Incremented { attempts } => {
                    debug!(
                        token = %token,
                        attempts,
                        max_attempts = record.max_validation_attempts,
                        "verification code accepted"
                    );
                    return Ok(true);
                }
                IncrementOutcome::Missing => return Err(Error::NotFound),
                // 记录在读取后被其他调用方修改，重新判断
                IncrementOutcome::Conflict => {}
            }
        }

        warn!(token = %token, attempts = budget, "validation kept conflicting with concurrent writers");
        Err(Error::internal(format!(
            "validation of token conflicted with concurrent writers {budget} times"
        )))
    }

    /// 在签发区内重新读取记录，仅当它仍处于终态时删除
    ///
    /// 返回是否删除了记录。
    pub(super) fn remove_if_terminal(&self, token: &str) -> Result<bool> {
        let _guard = self.lock_issuance()?;
        match self.store.get(token)? {
            Some(record) if record.state(self.clock.now()) != RecordState::Active => {
                self.store.remove(token)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ------------------------------------------------------------------------
    // 维护
    // ------------------------------------------------------------------------

    /// 清空所有记录（通常在关闭时调用）
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock_issuance()?;
        self.store.clear().inspect_err(|e| {
            warn!(operation = "clear", error = %e, "verification store call failed");
        })?;
        debug!("cleared all verification records");
        Ok(())
    }

    /// 当前存储的记录数量（包含尚未清理的过期记录）
    pub fn len(&self) -> Result<usize> {
        self.store.value_count()
    }

    /// 存储是否为空
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub(super) fn now(&self) -> Instant {
        self.clock.now()
    }

    fn lock_issuance(&self) -> Result<MutexGuard<'_, EntropySource>> {
        self.issuance
            .lock()
            .map_err(|_| Error::internal("issuance lock poisoned"))
    }
}

/// 存储调用失败时记录操作名和 token，错误本身原样向上返回
fn store_fault<'a>(operation: &'static str, token: &'a str) -> impl FnOnce(&Error) + 'a {
    move |error: &Error| {
        warn!(operation, token = %token, error = %error, "verification store call failed");
    }
}

/// 校验签发参数，返回用于计算过期时间的 chrono 时长
fn issuance_window(ttl: Duration, max_attempts: u32) -> Result<chrono::Duration> {
    if max_attempts == 0 {
        return Err(Error::invalid_request("max_attempts must be at least 1"));
    }
    if ttl.is_zero() {
        return Err(Error::invalid_request("ttl must be greater than zero"));
    }
    chrono::Duration::from_std(ttl).map_err(|_| Error::invalid_request("ttl is out of range"))
}
