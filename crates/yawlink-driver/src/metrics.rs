//! 桥接运行指标
//!
//! 零开销的原子计数器，主循环与总线回调都可以无锁更新，任意线程可读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 桥接实时指标
///
/// # 使用示例
///
/// ```rust
/// use yawlink_driver::BridgeMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = BridgeMetrics::default();
/// metrics.samples_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.samples_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 送入解缠器的有效姿态采样数
    pub samples_total: AtomicU64,
    /// 被拒绝的采样数（非有限四元数）
    pub samples_rejected: AtomicU64,
    /// IMU 读取错误次数
    pub poll_errors: AtomicU64,
    /// IMU 自报告的内部复位次数
    pub device_resets: AtomicU64,
    /// ACTIVE → RECOVERING 的次数（每个信号丢失周期一次）
    pub signal_lost_episodes: AtomicU64,
    /// 恢复尝试次数
    pub recovery_attempts: AtomicU64,
    /// 恢复失败次数
    pub recovery_failures: AtomicU64,
    /// 地址切换次数
    pub address_flips: AtomicU64,

    /// 解析成功的视觉帧数
    pub frames_ok: AtomicU64,
    /// 被丢弃的视觉行数
    pub frames_rejected: AtomicU64,
    /// 视觉串口重新同步次数
    pub vision_resyncs: AtomicU64,
    /// 视觉串口读取错误次数
    pub serial_errors: AtomicU64,

    /// 主机读取次数
    pub relay_reads: AtomicU64,
    /// 主机写入的命令字节数
    pub relay_commands: AtomicU64,
    /// 实际生效的重置零点次数
    pub rezero_applied: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计数器加一
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    ///
    /// 各计数器分别原子读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_total: self.samples_total.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            device_resets: self.device_resets.load(Ordering::Relaxed),
            signal_lost_episodes: self.signal_lost_episodes.load(Ordering::Relaxed),
            recovery_attempts: self.recovery_attempts.load(Ordering::Relaxed),
            recovery_failures: self.recovery_failures.load(Ordering::Relaxed),
            address_flips: self.address_flips.load(Ordering::Relaxed),
            frames_ok: self.frames_ok.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            vision_resyncs: self.vision_resyncs.load(Ordering::Relaxed),
            serial_errors: self.serial_errors.load(Ordering::Relaxed),
            relay_reads: self.relay_reads.load(Ordering::Relaxed),
            relay_commands: self.relay_commands.load(Ordering::Relaxed),
            rezero_applied: self.rezero_applied.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub samples_total: u64,
    pub samples_rejected: u64,
    pub poll_errors: u64,
    pub device_resets: u64,
    pub signal_lost_episodes: u64,
    pub recovery_attempts: u64,
    pub recovery_failures: u64,
    pub address_flips: u64,
    pub frames_ok: u64,
    pub frames_rejected: u64,
    pub vision_resyncs: u64,
    pub serial_errors: u64,
    pub relay_reads: u64,
    pub relay_commands: u64,
    pub rezero_applied: u64,
}

impl MetricsSnapshot {
    /// 视觉帧丢弃率（百分比），无数据时为 0
    pub fn frame_reject_rate(&self) -> f64 {
        let total = self.frames_ok + self.frames_rejected;
        if total == 0 {
            return 0.0;
        }
        (self.frames_rejected as f64 / total as f64) * 100.0
    }
}
