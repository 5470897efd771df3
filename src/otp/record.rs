//! OTP 记录

use std::time::{Duration, Instant};

/// 一条待验证的 OTP 记录
///
/// `validation_attempts` 统计的是**验证成功**的次数，不是错误猜测的次数：
/// 一条记录最多能被正确兑换 `max_validation_attempts` 次，错误的验证码不消耗次数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// 记录的 token
    pub token: String,

    /// 数字验证码
    pub code: String,

    /// 创建时间（单调时钟）
    pub created_at: Instant,

    /// 有效期
    pub ttl: Duration,

    /// 已成功验证的次数
    pub validation_attempts: u32,

    /// 最大验证次数
    pub max_validation_attempts: u32,
}

/// 记录在某一时刻的逻辑状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// 可以继续验证
    Active,
    /// 验证次数已用完
    Exhausted,
    /// 已超过有效期
    Expired,
}

impl OtpRecord {
    /// 创建一条新记录，验证次数从 0 开始
    pub fn new(
        token: impl Into<String>,
        code: impl Into<String>,
        created_at: Instant,
        ttl: Duration,
        max_validation_attempts: u32,
    ) -> Self {
        Self {
            token: token.into(),
            code: code.into(),
            created_at,
            ttl,
            validation_attempts: 0,
            max_validation_attempts,
        }
    }

    /// 记录的年龄
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// 是否已过期（年龄严格大于 ttl）
    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }

    /// 验证次数是否已用完
    pub fn is_exhausted(&self) -> bool {
        self.validation_attempts >= self.max_validation_attempts
    }

    /// 剩余可成功验证的次数
    pub fn remaining_validations(&self) -> u32 {
        self.max_validation_attempts
            .saturating_sub(self.validation_attempts)
    }

    /// 剩余有效时间
    pub fn remaining_ttl(&self, now: Instant) -> Duration {
        self.ttl.saturating_sub(self.age(now))
    }

    /// 计算记录的状态
    ///
    /// 次数用完优先于过期，与验证流程的检查顺序一致。
    pub fn state(&self, now: Instant) -> RecordState {
        if self.is_exhausted() {
            RecordState::Exhausted
        } else if self.is_expired(now) {
            RecordState::Expired
        } else {
            RecordState::Active
        }
    }

    /// 重置验证次数和创建时间
    pub(crate) fn refreshed(&self, now: Instant) -> Self {
        Self {
            created_at: now,
            validation_attempts: 0,
            ..self.clone()
        }
    }
}
