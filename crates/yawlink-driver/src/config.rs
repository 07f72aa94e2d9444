//! 桥接配置
//!
//! 所有字段都有默认值，TOML 文件中缺省的段/字段使用默认值补齐。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use yawlink_protocol::{
    DEFAULT_BOOT_WAIT_MS, DEFAULT_REPORT_INTERVAL_MS, DEFAULT_RESET_PULSE_MS,
    DEFAULT_RETRY_INTERVAL_MS, DEFAULT_SILENCE_TIMEOUT_MS, DEFAULT_VISION_SILENCE_TIMEOUT_MS,
    RELAY_SLAVE_ADDRESS, RelayExtension, SensorAddress,
};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// IMU 与存活监督配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuConfig {
    /// 首选 I2C 地址（0x4A 或 0x4B）
    pub primary_address: u8,
    /// 游戏旋转向量报告周期（毫秒）
    pub report_interval_ms: u64,
    /// 静默超时（毫秒），超过即进入恢复
    pub silence_timeout_ms: u64,
    /// 恢复尝试最小间隔（毫秒）
    pub retry_interval_ms: u64,
    /// 复位脉冲低电平时长（毫秒）
    pub reset_pulse_ms: u64,
    /// 复位释放后的启动等待（毫秒）；无复位线时作为稳定等待
    pub boot_wait_ms: u64,
    /// 每个 tick 最多处理的事件数
    pub max_events_per_tick: usize,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            primary_address: SensorAddress::Primary.as_u8(),
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            silence_timeout_ms: DEFAULT_SILENCE_TIMEOUT_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            reset_pulse_ms: DEFAULT_RESET_PULSE_MS,
            boot_wait_ms: DEFAULT_BOOT_WAIT_MS,
            max_events_per_tick: 32,
        }
    }
}

impl ImuConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// 首选地址（未校验的配置回退到主地址）
    pub fn primary(&self) -> SensorAddress {
        SensorAddress::try_from(self.primary_address).unwrap_or_default()
    }
}

/// 视觉串口配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// 串口静默多久后重新同步（毫秒）
    pub silence_timeout_ms: u64,
    /// 每个 tick 最多读取的字节数
    pub max_bytes_per_tick: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: DEFAULT_VISION_SILENCE_TIMEOUT_MS,
            max_bytes_per_tick: 256,
        }
    }
}

/// 主机中继配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 从机地址
    pub slave_address: u8,
    /// 保留字节的填充方式
    pub extension: RelayExtension,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            slave_address: RELAY_SLAVE_ADDRESS,
            extension: RelayExtension::None,
        }
    }
}

/// 主循环配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 每个 tick 之后的休眠（微秒）
    pub tick_interval_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_interval_us: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }
}

/// 完整的桥接配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub imu: ImuConfig,
    pub vision: VisionConfig,
    pub relay: RelayConfig,
    pub pipeline: PipelineConfig,
}

impl BridgeConfig {
    /// 从 TOML 文件加载
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到 TOML 文件（自动创建父目录）
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        SensorAddress::try_from(self.imu.primary_address)
            .map_err(|e| ConfigError::Invalid(format!("imu.primary_address: {}", e)))?;

        if self.imu.silence_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "imu.silence_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.imu.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "imu.report_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.imu.report_interval_ms > self.imu.silence_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "imu.report_interval_ms ({}) exceeds imu.silence_timeout_ms ({})",
                self.imu.report_interval_ms, self.imu.silence_timeout_ms
            )));
        }
        if self.imu.retry_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "imu.retry_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.imu.max_events_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "imu.max_events_per_tick must be non-zero".to_string(),
            ));
        }
        if self.vision.silence_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "vision.silence_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.vision.max_bytes_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "vision.max_bytes_per_tick must be non-zero".to_string(),
            ));
        }
        if self.relay.slave_address > 0x7F {
            return Err(ConfigError::Invalid(format!(
                "relay.slave_address 0x{:02X} is not a 7-bit address",
                self.relay.slave_address
            )));
        }
        if self.pipeline.tick_interval_us == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.tick_interval_us must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.imu.primary_address, 0x4A);
        assert_eq!(config.imu.report_interval_ms, 20);
        assert_eq!(config.imu.silence_timeout_ms, 1000);
        assert_eq!(config.vision.silence_timeout_ms, 2000);
        assert_eq!(config.relay.slave_address, 0x04);
        assert_eq!(config.relay.extension, RelayExtension::None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [imu]
            primary_address = 75
            silence_timeout_ms = 500

            [relay]
            extension = "obstacle_x"
            "#,
        )
        .unwrap();

        assert_eq!(config.imu.primary(), SensorAddress::Secondary);
        assert_eq!(config.imu.silence_timeout_ms, 500);
        assert_eq!(config.imu.retry_interval_ms, 1000);
        assert_eq!(config.relay.extension, RelayExtension::ObstacleX);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = BridgeConfig::from_toml_str("[imu\nprimary_address = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BridgeConfig::default();
        config.imu.primary_address = 0x10;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = BridgeConfig::default();
        config.imu.silence_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.imu.report_interval_ms = 2000;
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("exceeds"));

        let mut config = BridgeConfig::default();
        config.relay.slave_address = 0x80;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.pipeline.tick_interval_us = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = BridgeConfig::default();
        config.imu.retry_interval_ms = 250;
        config.relay.extension = RelayExtension::ObstacleX;
        config.save_to_file(&path).unwrap();

        let loaded = BridgeConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = BridgeConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
