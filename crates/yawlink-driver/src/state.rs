//! 共享状态
//!
//! 主循环是唯一写者；总线回调和诊断读者只读快照或原子字段，不持有任何锁。
//!
//! - 航向与视觉快照使用 `ArcSwap`，发布是一次原子指针替换，读者不会看到半更新的值
//! - 信号字节、重置零点请求等单字节状态直接使用原子类型

use crate::metrics::BridgeMetrics;
use crate::mode::{AtomicSupervisorState, SupervisorState};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};
use yawlink_protocol::{MarkerRecord, ObstacleRecord, SIGNAL_NONE, SensorAddress};

const COMMAND_SEEN: u16 = 0x100;

/// 已发布的航向快照
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YawSnapshot {
    /// 累计航向（度）
    pub accumulated_yaw_deg: f64,
    /// 是否已建立零点
    pub reference_is_set: bool,
    /// 自零点建立以来的采样数
    pub sample_count: u64,
    /// 发布时间（单调毫秒）
    pub updated_at_ms: u64,
}

/// 最近一次视觉记录
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisionSnapshot {
    pub obstacle: Option<ObstacleRecord>,
    pub marker: Option<MarkerRecord>,
    /// 最近一次有效帧的时间（单调毫秒）
    pub updated_at_ms: u64,
}

/// 桥接上下文
#[derive(Debug)]
pub struct BridgeContext {
    /// 航向快照
    pub yaw: ArcSwap<YawSnapshot>,
    /// 视觉快照
    pub vision: ArcSwap<VisionSnapshot>,
    /// 监督器状态镜像
    pub supervisor_state: AtomicSupervisorState,
    /// 运行指标
    pub metrics: BridgeMetrics,
    signal: AtomicU8,
    rezero_requested: AtomicBool,
    /// 高位置 1 表示已收到过命令，低 8 位为命令字节
    last_command: AtomicU16,
    sensor_address: AtomicU8,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self {
            yaw: ArcSwap::from_pointee(YawSnapshot::default()),
            vision: ArcSwap::from_pointee(VisionSnapshot::default()),
            supervisor_state: AtomicSupervisorState::default(),
            metrics: BridgeMetrics::default(),
            signal: AtomicU8::new(SIGNAL_NONE),
            rezero_requested: AtomicBool::new(false),
            last_command: AtomicU16::new(0),
            sensor_address: AtomicU8::new(SensorAddress::Primary.as_u8()),
        }
    }

    /// 读取航向快照（无锁）
    pub fn yaw_snapshot(&self) -> Arc<YawSnapshot> {
        self.yaw.load_full()
    }

    pub(crate) fn publish_yaw(&self, snapshot: YawSnapshot) {
        self.yaw.store(Arc::new(snapshot));
    }

    /// 读取视觉快照（无锁）
    pub fn vision_snapshot(&self) -> Arc<VisionSnapshot> {
        self.vision.load_full()
    }

    pub(crate) fn publish_vision(&self, snapshot: VisionSnapshot) {
        self.vision.store(Arc::new(snapshot));
    }

    /// 当前信号字节
    pub fn signal(&self) -> u8 {
        self.signal.load(Ordering::Acquire)
    }

    pub(crate) fn set_signal(&self, signal: u8) {
        self.signal.store(signal, Ordering::Release);
    }

    /// 请求重置零点（由主循环在下一个采样时执行）
    pub fn request_rezero(&self) {
        self.rezero_requested.store(true, Ordering::Release);
    }

    /// 取走挂起的重置零点请求
    pub(crate) fn take_rezero_request(&self) -> bool {
        self.rezero_requested.swap(false, Ordering::AcqRel)
    }

    pub fn rezero_pending(&self) -> bool {
        self.rezero_requested.load(Ordering::Acquire)
    }

    /// 主机最近写入的命令字节
    pub fn last_command(&self) -> Option<u8> {
        let raw = self.last_command.load(Ordering::Relaxed);
        (raw & COMMAND_SEEN != 0).then_some(raw as u8)
    }

    pub(crate) fn record_command(&self, command: u8) {
        self.last_command
            .store(COMMAND_SEEN | u16::from(command), Ordering::Relaxed);
    }

    pub fn supervisor_state(&self) -> SupervisorState {
        self.supervisor_state.get(Ordering::Acquire)
    }

    /// 监督器当前使用的传感器地址
    pub fn sensor_address(&self) -> SensorAddress {
        SensorAddress::try_from(self.sensor_address.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub(crate) fn set_sensor_address(&self, address: SensorAddress) {
        self.sensor_address.store(address.as_u8(), Ordering::Relaxed);
    }
}

impl Default for BridgeContext {
    fn default() -> Self {
        Self::new()
    }
}
