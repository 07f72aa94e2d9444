//! 主机总线中继协议
//!
//! 桥接器在主机总线上作为从机（地址 [`RELAY_SLAVE_ADDRESS`](crate::RELAY_SLAVE_ADDRESS)）：
//!
//! - 主机写：1 个或多个命令字节，`0x01` 表示航向重新归零
//! - 主机读：固定 5 字节载荷 `[yaw_lo, yaw_hi, signal, reserved, reserved]`
//!
//! `yaw` 为累计航向（度）× 100 后四舍五入的有符号 16 位整数，小端字节序。

use crate::{ProtocolError, bytes_to_i16_le, i16_to_bytes_le};
use num_enum::FromPrimitive;

/// 中继载荷长度（字节）
pub const RELAY_PAYLOAD_LEN: usize = 5;

/// 主机命令字节
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum HostCommand {
    /// 航向重新归零（在下一个处理的采样生效）
    ReZeroYaw = 0x01,
    /// 保留值：接受但无定义行为
    #[num_enum(catch_all)]
    Reserved(u8),
}

impl HostCommand {
    /// 原始命令字节
    pub fn as_u8(self) -> u8 {
        match self {
            HostCommand::ReZeroYaw => crate::CMD_REZERO_YAW,
            HostCommand::Reserved(value) => value,
        }
    }
}

/// 保留字节的用途
///
/// 默认两个保留字节恒为 0。`ObstacleX` 将最近一次障碍物的 x 偏移
/// 以小端 i16 放入保留字节，供需要目标坐标的主机使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RelayExtension {
    #[default]
    None,
    ObstacleX,
}

/// 中继载荷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayPayload {
    /// 累计航向（0.01 度）
    pub yaw_centi: i16,
    /// 信号字节
    pub signal: u8,
    /// 保留字节（见 [`RelayExtension`]）
    pub reserved: [u8; 2],
}

impl RelayPayload {
    /// 由累计航向（度）和信号字节构造
    ///
    /// 超出 i16 表示范围（约 ±327.67°）时按补码回绕，主机通过
    /// 相邻两次读取的差值即可恢复连续航向。
    pub fn from_degrees(accumulated_yaw_deg: f64, signal: u8) -> Self {
        Self {
            yaw_centi: degrees_to_centi(accumulated_yaw_deg),
            signal,
            reserved: [0; 2],
        }
    }

    /// 在保留字节中放入障碍物 x 偏移
    pub fn with_obstacle_x(mut self, x: i16) -> Self {
        self.reserved = i16_to_bytes_le(x);
        self
    }

    /// 航向（度）
    pub fn yaw_deg(&self) -> f64 {
        f64::from(self.yaw_centi) / 100.0
    }

    /// 保留字节按 i16 解释（仅在 `ObstacleX` 扩展下有意义）
    pub fn reserved_i16(&self) -> i16 {
        bytes_to_i16_le(self.reserved)
    }

    /// 编码为线上字节
    pub fn encode(&self) -> [u8; RELAY_PAYLOAD_LEN] {
        let yaw = i16_to_bytes_le(self.yaw_centi);
        [yaw[0], yaw[1], self.signal, self.reserved[0], self.reserved[1]]
    }

    /// 从线上字节解码
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != RELAY_PAYLOAD_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: RELAY_PAYLOAD_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            yaw_centi: bytes_to_i16_le([bytes[0], bytes[1]]),
            signal: bytes[2],
            reserved: [bytes[3], bytes[4]],
        })
    }
}

/// 度 → 0.01 度，四舍五入后截断为 16 位（补码回绕）
fn degrees_to_centi(deg: f64) -> i16 {
    if !deg.is_finite() {
        return 0;
    }
    let centi = (deg * 100.0).round();
    // 先落到 i64 再取低 16 位；|centi| 超出 i64 时 `as` 饱和，不会 UB
    (centi as i64) as i16
}
