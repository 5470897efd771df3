//! 时钟模块
//!
//! 引擎通过 [`Clock`] 读取单调时间，用于记录创建时间和判断过期。
//! 测试中使用 [`ManualClock`] 手动推进时间，避免 `sleep`。

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// 单调时钟接口
pub trait Clock: Send + Sync {
    /// 当前时刻
    fn now(&self) -> Instant;
}

/// 系统单调时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 可手动推进的时钟
///
/// 克隆出的实例共享同一个偏移量，可以一份交给引擎，一份留在测试里推进。
///
/// ```rust
/// use otprs::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(300));
/// assert_eq!(clock.now() - start, Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<RwLock<Duration>>,
}

impl ManualClock {
    /// 创建一个停在当前时刻的时钟
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// 向前推进时间
    pub fn advance(&self, by: Duration) {
        let mut offset = self
            .offset
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self
            .offset
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.origin + *offset
    }
}
