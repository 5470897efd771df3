//! # otprs
//!
//! 有时效的一次性验证码（OTP）签发与校验引擎。
//!
//! ## 功能特性
//!
//! - **签发**: 生成数字验证码和唯一的字母数字 token，也可以使用调用方指定的 token
//! - **校验**: 有效期（惰性过期）+ 成功验证次数上限
//! - **生命周期**: 刷新、撤销、存在性检查
//! - **清理**: 由外部定期调用的 `collect`，单条失败不中断
//! - **可插拔存储**: 实现 [`otp::OtpStore`] 即可接入 Redis、数据库等
//!
//! ## 设计原则
//!
//! 本库只负责验证码的生成和校验，**不包含**短信/邮件发送，也不包含定时调度。
//! 随机数生成器不是密码学安全的，安全性依赖于有效期和次数上限。
//!
//! ## 示例
//!
//! ```rust
//! use otprs::{OtpConfig, OtpEngine};
//! use std::time::Duration;
//!
//! let engine = OtpEngine::new(OtpConfig::standard()).unwrap();
//!
//! // 签发验证码（5 分钟有效，只能成功验证 1 次）
//! let issued = engine.new_code(Duration::from_secs(300), 1).unwrap();
//!
//! // 错误的验证码返回 false，不消耗次数
//! let wrong = if issued.code == "000000" { "111111" } else { "000000" };
//! assert!(!engine.validate(&issued.token, wrong).unwrap());
//!
//! // 正确的验证码
//! assert!(engine.validate(&issued.token, &issued.code).unwrap());
//! ```
//!
//! ## 绑定到已有会话
//!
//! ```rust
//! use otprs::{Error, OtpConfig, OtpEngine};
//! use std::time::Duration;
//!
//! let engine = OtpEngine::new(OtpConfig::standard()).unwrap();
//! let ttl = Duration::from_secs(300);
//!
//! let code = engine.new_code_with_assigned_token("session-8f2c", ttl, 1).unwrap();
//!
//! // 同一会话在撤销或过期前不能再次签发
//! assert!(matches!(
//!     engine.new_code_with_assigned_token("session-8f2c", ttl, 1),
//!     Err(Error::AlreadyExists)
//! ));
//!
//! engine.cancel("session-8f2c").unwrap();
//! # let _ = code;
//! ```

pub mod clock;
pub mod error;
pub mod otp;
pub mod random;

pub use error::{Error, Result};

// ============================================================================
// OTP 相关导出
// ============================================================================

pub use otp::{
    CollectReport, InMemoryOtpStore, IssuedCode, OtpConfig, OtpEngine, OtpRecord, OtpStore,
    RecordState, RecordStatus,
};

// ============================================================================
// 基础设施导出
// ============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use random::EntropySource;
