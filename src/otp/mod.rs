//! 一次性验证码（OTP）模块
//!
//! 在敏感的账户操作（创建、登录、删除）前签发并校验有时效的一次性验证码。
//!
//! ## 工作流程
//!
//! 1. 调用方请求验证码（可以指定自己的 token）
//! 2. 引擎保证 token 唯一，生成数字验证码并保存记录
//! 3. 应用层通过短信/邮件把验证码发给用户
//! 4. 用户提交验证码和 token
//! 5. 引擎校验并返回结果，同时更新或删除记录
//!
//! ## 记录状态
//!
//! ```text
//! Active ──(成功验证达到上限)──> Exhausted ──> 删除
//! Active ──(超过 ttl)──────────> Expired ────> 删除
//! Active ──(cancel)──────────────────────────> 删除
//! ```
//!
//! 过期是惰性判断的：只在 `validate` 或 `collect` 时发现并删除。
//!
//! ## 示例
//!
//! ```rust
//! use otprs::otp::{OtpConfig, OtpEngine};
//! use otprs::Error;
//! use std::time::Duration;
//!
//! let engine = OtpEngine::new(OtpConfig::new(6, 10)).unwrap();
//!
//! let issued = engine.new_code(Duration::from_secs(5 * 60), 1).unwrap();
//! // send_sms(phone, &issued.code);
//!
//! assert!(engine.validate(&issued.token, &issued.code).unwrap());
//! assert!(matches!(
//!     engine.validate(&issued.token, &issued.code),
//!     Err(Error::AttemptsExceeded)
//! ));
//!
//! // 由外部调度方定期调用
//! let report = engine.collect().unwrap();
//! assert!(report.is_clean());
//! ```

pub mod config;
pub mod engine;
pub mod record;
pub mod store;
pub mod sweep;

pub use config::{DEFAULT_RETRY_BUDGET, OtpConfig};
pub use engine::{IssuedCode, OtpEngine, RecordStatus};
pub use record::{OtpRecord, RecordState};
pub use store::{InMemoryOtpStore, IncrementOutcome, OtpStore};
pub use sweep::{CollectReport, SweepFailure};
