//! OTP 引擎配置

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// 随机 token 唯一性搜索的默认尝试次数
pub const DEFAULT_RETRY_BUDGET: u32 = 1000;

/// OTP 引擎配置
///
/// 验证码长度和 token 长度必须由调用方显式给出；
/// 有效期和最大验证次数是每次签发时的参数，不在这里配置。
///
/// 实现了 `Deserialize`，可以直接从应用自己的配置文件中读取：
///
/// ```rust
/// use otprs::otp::OtpConfig;
///
/// let config: OtpConfig =
///     serde_json::from_str(r#"{ "code_length": 6, "token_length": 10 }"#).unwrap();
/// assert_eq!(config.retry_budget, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpConfig {
    /// 验证码长度（数字位数）
    pub code_length: usize,

    /// token 长度（字符数）
    pub token_length: usize,

    /// 随机 token 冲突时的最大重试次数
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
}

fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

impl OtpConfig {
    /// 创建新配置
    pub fn new(code_length: usize, token_length: usize) -> Self {
        Self {
            code_length,
            token_length,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    /// 设置 token 冲突重试次数
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// 标准配置
    ///
    /// - 6 位验证码
    /// - 10 字符 token
    pub fn standard() -> Self {
        Self::new(6, 10)
    }

    /// 高安全性配置
    ///
    /// - 8 位验证码
    /// - 32 字符 token
    pub fn high_security() -> Self {
        Self::new(8, 32)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.code_length == 0 {
            return Err(ConfigError::invalid("code_length", "must be at least 1").into());
        }
        if self.token_length == 0 {
            return Err(ConfigError::invalid("token_length", "must be at least 1").into());
        }
        if self.retry_budget == 0 {
            return Err(ConfigError::invalid("retry_budget", "must be at least 1").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_presets() {
        let standard = OtpConfig::standard();
        assert_eq!(standard.code_length, 6);
        assert_eq!(standard.token_length, 10);
        assert_eq!(standard.retry_budget, DEFAULT_RETRY_BUDGET);

        let strict = OtpConfig::high_security();
        assert_eq!(strict.code_length, 8);
        assert_eq!(strict.token_length, 32);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(OtpConfig::new(6, 10).validate().is_ok());
        assert!(matches!(
            OtpConfig::new(0, 10).validate(),
            Err(Error::Config(ConfigError::InvalidValue { key, .. })) if key == "code_length"
        ));
        assert!(matches!(
            OtpConfig::new(6, 0).validate(),
            Err(Error::Config(ConfigError::InvalidValue { key, .. })) if key == "token_length"
        ));
        assert!(
            OtpConfig::standard()
                .with_retry_budget(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_with_explicit_budget() {
        let config: OtpConfig = serde_json::from_str(
            r#"{ "code_length": 4, "token_length": 16, "retry_budget": 5 }"#,
        )
        .unwrap();
        assert_eq!(config, OtpConfig::new(4, 16).with_retry_budget(5));
    }

    #[test]
    fn test_deserialize_requires_lengths() {
        assert!(serde_json::from_str::<OtpConfig>(r#"{ "code_length": 6 }"#).is_err());
    }
}
