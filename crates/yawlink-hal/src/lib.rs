//! # yawlink Hardware Abstraction Layer
//!
//! 硬件抽象层，为融合引擎提供统一的设备接口：
//!
//! - [`OrientationSensor`]: 带片上融合的 IMU（输出四元数）
//! - [`SerialLink`]: 视觉传感器串口（字节级非阻塞读取）
//! - [`ResetLine`]: 可选的 IMU 硬件复位线
//! - [`Clock`] / [`Delay`]: 单调毫秒时钟与有界延时
//!
//! 总线初始化（时钟频率、引脚分配）不在本层范围内，由具体后端在构造时完成。

use std::time::Duration;
use thiserror::Error;

pub use yawlink_protocol::{OrientationSample, SensorAddress};

#[cfg(feature = "std-backend")]
pub mod clock;
#[cfg(feature = "std-backend")]
pub mod serial;

#[cfg(feature = "std-backend")]
pub use clock::{MonotonicClock, SpinDelay};
#[cfg(feature = "std-backend")]
pub use serial::ReaderSerialLink;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// 硬件层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("No acknowledge from device at {0}")]
    NoAcknowledge(SensorAddress),
    #[error("Bus timeout")]
    Timeout,
    #[error("Device not started")]
    NotStarted,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// 设备不在总线上（拔出、掉电、串口断开）
    NotFound,
    /// 后端驱动报告的其他故障
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl HalError {
    /// 设备已不在总线上
    pub fn is_device_gone(&self) -> bool {
        matches!(
            self,
            HalError::Device(DeviceError {
                kind: DeviceErrorKind::NotFound,
                ..
            })
        )
    }
}

/// IMU 报告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// 游戏旋转向量（陀螺仪 + 加速度计，不含磁力计）
    GameRotationVector,
    /// 其他报告（原始报告 ID）
    Other(u8),
}

impl ReportKind {
    /// SH-2 游戏旋转向量报告 ID
    pub const GAME_ROTATION_VECTOR_ID: u8 = 0x08;

    pub fn from_report_id(id: u8) -> Self {
        if id == Self::GAME_ROTATION_VECTOR_ID {
            ReportKind::GameRotationVector
        } else {
            ReportKind::Other(id)
        }
    }
}

/// IMU 事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    /// 报告类型
    pub report: ReportKind,
    /// 姿态四元数（仅旋转向量类报告携带）
    pub sample: Option<OrientationSample>,
    /// 设备自上次读取以来发生过内部复位
    pub device_reset: bool,
}

impl SensorEvent {
    /// 游戏旋转向量事件
    pub fn rotation(sample: OrientationSample) -> Self {
        Self {
            report: ReportKind::GameRotationVector,
            sample: Some(sample),
            device_reset: false,
        }
    }

    /// 设备复位通知（不携带采样）
    pub fn reset_notice() -> Self {
        Self {
            report: ReportKind::Other(0),
            sample: None,
            device_reset: true,
        }
    }

    /// 游戏旋转向量采样（其他报告返回 None）
    pub fn rotation_sample(&self) -> Option<OrientationSample> {
        match self.report {
            ReportKind::GameRotationVector => self.sample,
            ReportKind::Other(_) => None,
        }
    }
}

/// 带片上融合的姿态传感器
pub trait OrientationSensor {
    /// 在指定地址初始化设备
    fn begin(&mut self, address: SensorAddress) -> Result<(), HalError>;

    /// 启用游戏旋转向量报告
    fn enable_rotation_report(&mut self, interval: Duration) -> Result<(), HalError>;

    /// 存活探测
    fn is_connected(&mut self) -> bool;

    /// 取出一个待处理事件（无事件时返回 `Ok(None)`，不阻塞）
    fn poll_event(&mut self) -> Result<Option<SensorEvent>, HalError>;
}

/// 视觉串口（字节级、非阻塞）
pub trait SerialLink {
    /// 读取当前可用字节，返回读取数量（0 表示暂无数据）
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HalError>;

    /// 丢弃所有待读字节，返回丢弃数量
    fn discard_input(&mut self) -> Result<usize, HalError> {
        let mut scratch = [0u8; 64];
        let mut total = 0;
        loop {
            let n = self.read_available(&mut scratch)?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
        }
    }
}

/// IMU 硬件复位线（低电平有效）
pub trait ResetLine {
    fn set_low(&mut self) -> Result<(), HalError>;
    fn set_high(&mut self) -> Result<(), HalError>;
}

/// 单调毫秒时钟
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// 有界延时
pub trait Delay {
    fn delay_ms(&mut self, ms: u64);
}

impl<T: OrientationSensor + ?Sized> OrientationSensor for Box<T> {
    fn begin(&mut self, address: SensorAddress) -> Result<(), HalError> {
        (**self).begin(address)
    }

    fn enable_rotation_report(&mut self, interval: Duration) -> Result<(), HalError> {
        (**self).enable_rotation_report(interval)
    }

    fn is_connected(&mut self) -> bool {
        (**self).is_connected()
    }

    fn poll_event(&mut self) -> Result<Option<SensorEvent>, HalError> {
        (**self).poll_event()
    }
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HalError> {
        (**self).read_available(buf)
    }

    fn discard_input(&mut self) -> Result<usize, HalError> {
        (**self).discard_input()
    }
}
