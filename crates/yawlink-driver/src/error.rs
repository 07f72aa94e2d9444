//! 驱动层错误类型定义

use crate::config::ConfigError;
use thiserror::Error;
use yawlink_hal::HalError;
use yawlink_protocol::ProtocolError;

/// 驱动层错误类型
///
/// 融合主循环内部的故障（传感器静默、畸形视觉帧、初始化失败）全部在本地消化，
/// 不会以本类型返回；这里只覆盖构建、配置和线程生命周期相关的错误。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 硬件层错误
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// 协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 主循环线程错误
    #[error("Fusion thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}
