//! Silence watchdog - detects when a data source stops producing
//!
//! Used by the liveness supervisor (IMU samples) and by the vision link (serial bytes).
//! Timestamps come from the injected [`Clock`](yawlink_hal::Clock) so the watchdog
//! behaves identically under a real monotonic clock and a manual test clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Silence watchdog
///
/// Tracks the time of the last sign of life and reports when it is older than the timeout.
#[derive(Debug)]
pub struct SilenceWatchdog {
    last_activity_ms: AtomicU64,
    timeout_ms: u64,
}

impl SilenceWatchdog {
    /// Create a watchdog armed at `now_ms`
    pub fn new(timeout: Duration, now_ms: u64) -> Self {
        Self {
            last_activity_ms: AtomicU64::new(now_ms),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Register activity at `now_ms`
    pub fn rearm(&self, now_ms: u64) {
        self.last_activity_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Time since the last activity
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_ms.load(Ordering::Relaxed))
    }

    /// True once more than `timeout` has passed without activity
    pub fn is_silent(&self, now_ms: u64) -> bool {
        self.elapsed_ms(now_ms) > self.timeout_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
