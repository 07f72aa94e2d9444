//! 协议常量定义
//!
//! 总线地址、默认时序参数和信号码。

use crate::ProtocolError;

/// 主机总线（从机模式）设备地址
pub const RELAY_SLAVE_ADDRESS: u8 = 0x04;

/// IMU 主地址（ADR 引脚拉低）
pub const IMU_PRIMARY_ADDRESS: u8 = 0x4A;

/// IMU 备用地址（ADR 引脚拉高）
pub const IMU_SECONDARY_ADDRESS: u8 = 0x4B;

/// 姿态报告周期（毫秒），约 50Hz
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 20;

/// IMU 静默超时（毫秒）
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 1000;

/// 恢复重试最小间隔（毫秒）
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// 硬件复位脉冲宽度（毫秒）
pub const DEFAULT_RESET_PULSE_MS: u64 = 5;

/// 复位后（或无复位线时）的启动等待（毫秒）
pub const DEFAULT_BOOT_WAIT_MS: u64 = 300;

/// 视觉串口静默超时（毫秒）
pub const DEFAULT_VISION_SILENCE_TIMEOUT_MS: u64 = 2000;

/// 视觉文本行最大长度（字节，不含行结束符）
pub const MAX_LINE_LEN: usize = 128;

/// 主机命令：航向重新归零
pub const CMD_REZERO_YAW: u8 = 0x01;

/// 信号码：红色障碍物
pub const SIGNAL_RED: u8 = 1;

/// 信号码：绿色障碍物
pub const SIGNAL_GREEN: u8 = 2;

/// 信号码：无障碍物（上电默认值）
pub const SIGNAL_NONE: u8 = 6;

/// IMU 总线地址
///
/// 固定的两地址集合。恢复流程在两者之间切换，而不是翻转一个布尔值，
/// 以便后续扩展更多候选地址时流程保持显式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorAddress {
    /// 0x4A
    #[default]
    Primary,
    /// 0x4B
    Secondary,
}

impl SensorAddress {
    /// 全部候选地址（按尝试顺序）
    pub const ALL: [SensorAddress; 2] = [SensorAddress::Primary, SensorAddress::Secondary];

    /// 7 位总线地址
    pub fn as_u8(self) -> u8 {
        match self {
            SensorAddress::Primary => IMU_PRIMARY_ADDRESS,
            SensorAddress::Secondary => IMU_SECONDARY_ADDRESS,
        }
    }

    /// 候选集合中的另一个地址
    pub fn alternate(self) -> Self {
        match self {
            SensorAddress::Primary => SensorAddress::Secondary,
            SensorAddress::Secondary => SensorAddress::Primary,
        }
    }
}

impl TryFrom<u8> for SensorAddress {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            IMU_PRIMARY_ADDRESS => Ok(SensorAddress::Primary),
            IMU_SECONDARY_ADDRESS => Ok(SensorAddress::Secondary),
            _ => Err(ProtocolError::UnknownAddress { address: value }),
        }
    }
}

impl std::fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.as_u8())
    }
}
