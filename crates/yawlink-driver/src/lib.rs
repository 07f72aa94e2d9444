//! 驱动层模块
//!
//! 本模块提供 yawlink 桥接器的运行时引擎，包括：
//! - 航向解缠（连续累计航向）
//! - IMU 存活监督与自动恢复
//! - 视觉串口行组装与帧解析
//! - 主机中继应答（无锁快照读取）
//! - 主循环线程管理
//!
//! # 使用场景
//!
//! 通过 [`BridgeBuilder`] 组装硬件适配器并启动主循环，主机总线回调持有
//! [`RelayResponder`] 应答读写请求。

mod bridge;
mod builder;
pub mod config;
mod error;
pub mod heading;
pub mod heartbeat;
pub mod metrics;
pub mod mode;
pub mod pipeline;
pub mod relay;
pub mod state;
pub mod supervisor;
pub mod vision;

pub use bridge::Bridge;
pub use builder::BridgeBuilder;
pub use config::{BridgeConfig, ConfigError, ImuConfig, PipelineConfig, RelayConfig, VisionConfig};
pub use error::DriverError;
pub use heading::{AngleUnwrapper, YawState, wrap180};
pub use heartbeat::SilenceWatchdog;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use mode::{AtomicSupervisorState, SupervisorState};
pub use pipeline::{FusionEngine, TickReport, fusion_loop};
pub use relay::RelayResponder;
pub use state::{BridgeContext, VisionSnapshot, YawSnapshot};
pub use supervisor::{LivenessSupervisor, SensorHandle, SignalLostReason, SupervisorEvent};
pub use vision::{FrameParser, VisionLink, VisionTick};
