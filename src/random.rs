//! 随机数生成模块
//!
//! 提供验证码与 token 所需的熵源和字符串生成函数。
//!
//! ## 安全说明
//!
//! [`EntropySource`] 是一个以高精度时钟为种子的伪随机数生成器，**不是**密码学安全的。
//! 验证码的安全性依赖于有效期和验证次数上限，而不是随机数的质量。

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::{Error, Result};

/// 验证码字符集（纯数字）
pub const DIGITS: &str = "0123456789";

/// token 字符集（小写字母和数字）
pub const LOWER_ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// 从字符集中生成指定长度的随机字符串
///
/// 每个字符独立、均匀地从 `alphabet` 中选取。
///
/// # Arguments
///
/// * `length` - 要生成的字符数
/// * `alphabet` - 候选字符集（不能为空）
/// * `rng` - 随机数生成器
///
/// # Example
///
/// ```rust
/// use otprs::random::{generate, EntropySource, DIGITS};
///
/// let mut source = EntropySource::from_seed(42);
/// let code = generate(6, DIGITS, source.rng()).unwrap();
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_digit()));
/// ```
pub fn generate<R: Rng>(length: usize, alphabet: &str, rng: &mut R) -> Result<String> {
    let symbols: Vec<char> = alphabet.chars().collect();
    if symbols.is_empty() {
        return Err(Error::invalid_request("alphabet must not be empty"));
    }

    Ok((0..length)
        .map(|_| symbols[rng.random_range(0..symbols.len())])
        .collect())
}

/// 熵源
///
/// 在引擎构造时播种一次，之后所有验证码和 token 都从这里取随机数。
/// 本身不做同步，由调用方（引擎的串行区）保证独占访问。
#[derive(Debug, Clone)]
pub struct EntropySource {
    rng: StdRng,
}

impl EntropySource {
    /// 以当前系统时间（纳秒）为种子创建熵源
    pub fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::from_seed(seed)
    }

    /// 使用固定种子创建熵源（用于可复现的测试）
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 生成数字验证码
    pub fn code(&mut self, length: usize) -> Result<String> {
        generate(length, DIGITS, &mut self.rng)
    }

    /// 生成小写字母数字 token
    pub fn token(&mut self, length: usize) -> Result<String> {
        generate(length, LOWER_ALPHANUMERIC, &mut self.rng)
    }

    /// 获取底层随机数生成器
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::from_clock()
    }
}

/// 判断字符串是否完全由给定字符集中的字符组成
#[cfg(test)]
pub(crate) fn is_in_alphabet(value: &str, alphabet: &str) -> bool {
    value.chars().all(|c| alphabet.contains(c))
}

/// 常量时间比较两个字符串
///
/// 用于比较用户提交的验证码，防止时序攻击
///
/// # Example
///
/// ```rust
/// use otprs::random::constant_time_compare_str;
///
/// assert!(constant_time_compare_str("483920", "483920"));
/// assert!(!constant_time_compare_str("483920", "483921"));
/// ```
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
