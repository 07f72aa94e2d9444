//! 基于 std 的时钟与延时
//!
//! **App Start Relative Time Pattern**:
//! - 单调时间锚定在进程首次访问时刻
//! - 不受系统时钟调整（NTP、手动修改）影响

use crate::{Clock, Delay};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// 全局单调时间锚点（首次访问时设置，之后不变）
static APP_START: OnceLock<Instant> = OnceLock::new();

fn monotonic_millis() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}

/// 进程内单调毫秒时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        // 提前初始化锚点
        let _ = APP_START.get_or_init(Instant::now);
        Self
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        monotonic_millis()
    }
}

/// 使用 `spin_sleep` 的延时（亚毫秒精度）
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn delay_ms(&mut self, ms: u64) {
        spin_sleep::sleep(Duration::from_millis(ms));
    }
}
