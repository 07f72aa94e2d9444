//! Mock 时钟与复位线

use crate::{Clock, Delay, HalError, ResetLine};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 手动推进的毫秒时钟
///
/// 同时实现 [`Clock`] 与 [`Delay`]：延时直接推进时间而不真正睡眠，
/// 克隆体共享同一时间线。
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_ms: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(ms)),
        }
    }

    /// 推进时间
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// 设置绝对时间
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

impl Delay for MockClock {
    fn delay_ms(&mut self, ms: u64) {
        self.advance(ms);
    }
}

/// 记录电平变化的复位线
#[derive(Debug, Clone, Default)]
pub struct MockResetLine {
    /// 电平历史（true = 高）
    levels: Arc<Mutex<Vec<bool>>>,
}

impl MockResetLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 电平变化历史
    pub fn history(&self) -> Vec<bool> {
        self.levels.lock().clone()
    }

    /// 完整复位脉冲（低→高）次数
    pub fn pulse_count(&self) -> usize {
        self.levels
            .lock()
            .windows(2)
            .filter(|w| !w[0] && w[1])
            .count()
    }
}

impl ResetLine for MockResetLine {
    fn set_low(&mut self) -> Result<(), HalError> {
        self.levels.lock().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), HalError> {
        self.levels.lock().push(true);
        Ok(())
    }
}
