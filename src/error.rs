//! 统一错误类型模块
//!
//! 提供 otprs 库中所有操作的错误类型定义。
//!
//! 注意：验证码不匹配**不是**错误，[`crate::otp::OtpEngine::validate`] 会返回 `Ok(false)`。

use thiserror::Error;

/// otprs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// otprs 库的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// token 对应的记录不存在
    #[error("no pending verification for this token")]
    NotFound,

    /// 指定的 token 已被一个存活的记录占用
    #[error("a pending verification already exists for this token")]
    AlreadyExists,

    /// 随机 token 的唯一性搜索次数用尽
    #[error("could not find a free token after {attempts} attempts")]
    RetriesExceeded {
        /// 已尝试的次数
        attempts: u32,
    },

    /// 记录已超过有效期（记录已被删除）
    #[error("verification code has expired")]
    Expired,

    /// 记录的验证次数已用完（记录已被删除）
    #[error("maximum validation attempts exceeded")]
    AttemptsExceeded,

    /// 调用参数无效
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个参数错误
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// 是否属于应向终端用户统一展示为“验证失败”的错误
    ///
    /// 调用方不应向用户区分记录不存在、已过期或次数用尽，
    /// 否则会泄露记录的存在与状态。
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Error::NotFound | Error::Expired | Error::AttemptsExceeded
        )
    }
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// 连接失败
    #[error("storage connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作失败
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
}

impl StorageError {
    pub(crate) fn lock_poisoned() -> Self {
        StorageError::OperationFailed("lock poisoned".into())
    }
}
