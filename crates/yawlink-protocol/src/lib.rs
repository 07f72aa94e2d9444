//! # yawlink Protocol
//!
//! 航向桥接器的线上数据格式定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 总线地址、默认时序常量、信号码
//! - `sample`: IMU 姿态采样（单位四元数）
//! - `vision`: 视觉传感器文本行解析（`O,` / `MAG,` 帧）
//! - `relay`: 主机总线载荷编码与命令字节
//!
//! ## 字节序
//!
//! 主机总线载荷使用小端字节序（低字节在前），与视觉串口的 ASCII 文本格式无关。

pub mod constants;
pub mod relay;
pub mod sample;
pub mod vision;

// 重新导出常用类型
pub use constants::*;
pub use relay::{HostCommand, RELAY_PAYLOAD_LEN, RelayExtension, RelayPayload};
pub use sample::OrientationSample;
pub use vision::{MarkerRecord, ObstacleRecord, ParseError, VisionFrame, parse_line};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown sensor address: 0x{address:02X}")]
    UnknownAddress { address: u8 },
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// i16 转小端字节序
pub fn i16_to_bytes_le(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_i16_le() {
        assert_eq!(bytes_to_i16_le([0x34, 0x12]), 0x1234);
    }

    #[test]
    fn test_bytes_to_i16_le_negative() {
        assert_eq!(bytes_to_i16_le([0xFF, 0xFF]), -1);
        assert_eq!(bytes_to_i16_le([0x00, 0x80]), i16::MIN);
    }

    #[test]
    fn test_i16_to_bytes_le() {
        assert_eq!(i16_to_bytes_le(0x1234), [0x34, 0x12]);
        assert_eq!(i16_to_bytes_le(-200), [0x38, 0xFF]);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 5,
            actual: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Invalid payload length: expected 5, got 3"
        );

        let err = ProtocolError::UnknownAddress { address: 0x29 };
        assert_eq!(format!("{}", err), "Unknown sensor address: 0x29");
    }
}
