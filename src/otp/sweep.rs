//! 过期记录清理
//!
//! 引擎内部没有定时器，[`OtpEngine::collect`] 需要由外部调度方定期调用。
//! 单条记录删除失败不会中断清理，失败会记录在 [`CollectReport::failures`] 中。

use tracing::{info, warn};

use super::engine::OtpEngine;
use super::record::RecordState;
use super::store::OtpStore;
use crate::error::{Error, Result};

/// 单条记录清理失败的诊断信息
#[derive(Debug)]
pub struct SweepFailure {
    /// 记录的 token
    pub token: String,
    /// 失败原因
    pub error: Error,
}

/// 一次清理的结果
#[derive(Debug, Default)]
pub struct CollectReport {
    /// 扫描的记录数
    pub examined: usize,
    /// 因过期删除的记录数
    pub expired: usize,
    /// 因次数用完删除的记录数
    pub exhausted: usize,
    /// 删除失败的记录
    pub failures: Vec<SweepFailure>,
}

impl CollectReport {
    /// 删除的记录总数
    pub fn removed(&self) -> usize {
        self.expired + self.exhausted
    }

    /// 是否全部成功
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<S: OtpStore> OtpEngine<S> {
    /// 清理过期或次数已用完的记录
    ///
    /// # Errors
    ///
    /// 只有批量读取失败时返回错误；单条删除失败记入报告，清理继续进行。
    pub fn collect(&self) -> Result<CollectReport> {
        let records = self.store().get_all()?;
        let examined = records.len();
        let now = self.now();

        let report = records
            .into_iter()
            .filter_map(|(token, record)| match record.state(now) {
                RecordState::Active => None,
                state => Some((token, state)),
            })
            .fold(
                CollectReport {
                    examined,
                    ..Default::default()
                },
                |mut report, (token, state)| {
                    match self.remove_if_terminal(&token) {
                        Ok(true) if state == RecordState::Expired => report.expired += 1,
                        Ok(true) => report.exhausted += 1,
                        // 在此期间已被刷新或删除
                        Ok(false) => {}
                        Err(error) => {
                            warn!(token = %token, error = %error, "failed to remove stale verification record");
                            report.failures.push(SweepFailure { token, error });
                        }
                    }
                    report
                },
            );

        if report.removed() > 0 || !report.is_clean() {
            info!(
                examined = report.examined,
                expired = report.expired,
                exhausted = report.exhausted,
                failures = report.failures.len(),
                "swept verification records"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StorageError;
    use crate::otp::config::OtpConfig;
    use crate::otp::record::OtpRecord;
    use crate::otp::store::{IncrementOutcome, InMemoryOtpStore};
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    /// 对指定 token 的删除操作总是失败的存储
    struct FlakyStore {
        inner: InMemoryOtpStore,
        broken: HashSet<String>,
    }

    impl OtpStore for FlakyStore {
        fn save(&self, token: &str, record: OtpRecord) -> Result<()> {
            self.inner.save(token, record)
        }

        fn get(&self, token: &str) -> Result<Option<OtpRecord>> {
            self.inner.get(token)
        }

        fn get_all(&self) -> Result<HashMap<String, OtpRecord>> {
            self.inner.get_all()
        }

        fn value_count(&self) -> Result<usize> {
            self.inner.value_count()
        }

        fn has(&self, token: &str) -> Result<bool> {
            self.inner.has(token)
        }

        fn remove(&self, token: &str) -> Result<()> {
            if self.broken.contains(token) {
                return Err(StorageError::ConnectionFailed("replica unavailable".into()).into());
            }
            self.inner.remove(token)
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }

        fn increment_if_unchanged(
            &self,
            token: &str,
            snapshot: &OtpRecord,
        ) -> Result<IncrementOutcome> {
            self.inner.increment_if_unchanged(token, snapshot)
        }
    }

    fn engine() -> (OtpEngine, ManualClock) {
        let clock = ManualClock::new();
        let engine = OtpEngine::new(OtpConfig::standard())
            .unwrap()
            .with_clock(clock.clone());
        (engine, clock)
    }

    #[test]
    fn test_collect_fresh_records_is_noop() {
        let (engine, _) = engine();
        for _ in 0..3 {
            engine.new_code(TTL, 1).unwrap();
        }

        let report = engine.collect().unwrap();
        assert_eq!(report.examined, 3);
        assert_eq!(report.removed(), 0);
        assert!(report.is_clean());
        assert_eq!(engine.len().unwrap(), 3);
    }

    #[test]
    fn test_collect_removes_expired() {
        let (engine, clock) = engine();
        let old = engine.new_code(TTL, 1).unwrap();

        clock.advance(Duration::from_secs(45));
        let young = engine.new_code(TTL, 1).unwrap();

        clock.advance(Duration::from_secs(30));
        let report = engine.collect().unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(report.exhausted, 0);
        assert!(!engine.exists(&old.token).unwrap());
        assert!(engine.exists(&young.token).unwrap());
    }

    #[test]
    fn test_collect_removes_exhausted() {
        let (engine, _) = engine();
        let issued = engine.new_code(TTL, 1).unwrap();
        assert!(engine.validate(&issued.token, &issued.code).unwrap());

        // 次数用完后记录仍在，直到下一次验证或清理
        assert!(engine.exists(&issued.token).unwrap());

        let report = engine.collect().unwrap();
        assert_eq!(report.exhausted, 1);
        assert!(!engine.exists(&issued.token).unwrap());
    }

    #[test]
    fn test_collect_continues_after_failure() {
        let clock = ManualClock::new();
        let store = FlakyStore {
            inner: InMemoryOtpStore::new(),
            broken: HashSet::from(["stuck".to_string()]),
        };
        let engine = OtpEngine::with_store(store, OtpConfig::standard())
            .unwrap()
            .with_clock(clock.clone());

        for token in ["alpha", "stuck", "omega"] {
            engine.new_code_with_assigned_token(token, TTL, 1).unwrap();
        }
        clock.advance(TTL * 2);

        let report = engine.collect().unwrap();

        assert_eq!(report.examined, 3);
        assert_eq!(report.expired, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].token, "stuck");
        assert!(matches!(report.failures[0].error, Error::Storage(_)));
        assert_eq!(engine.len().unwrap(), 1);
    }
}
