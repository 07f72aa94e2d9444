//! 配置管理命令
//!
//! 管理桥接器的 TOML 配置文件（默认 `<config_dir>/yawlink/config.toml`）

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use yawlink_driver::BridgeConfig;

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("yawlink");
    path.push("config.toml");
    Ok(path)
}

/// 解析配置路径（未指定时使用默认路径）
fn resolve(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => default_config_path(),
    }
}

/// 加载配置：文件不存在时返回默认配置
pub fn load_or_default(path: Option<&Path>) -> Result<BridgeConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    if !path.exists() {
        return Ok(BridgeConfig::default());
    }
    let config = BridgeConfig::load_from_file(&path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("配置无效: {}", path.display()))?;
    Ok(config)
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写入默认配置
    Init {
        /// 配置文件路径
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },

    /// 打印当前生效的配置
    Show {
        /// 配置文件路径
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        /// 配置文件路径
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Init { path, force } => Self::init_(resolve(path)?, force),
            ConfigCommand::Show { path } => Self::show_(resolve(path)?),
            ConfigCommand::Check { path } => Self::check_(resolve(path)?),
        }
    }

    fn init_(path: PathBuf, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "配置文件已存在: {}（使用 --force 覆盖）",
                path.display()
            );
        }
        BridgeConfig::default()
            .save_to_file(&path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn show_(path: PathBuf) -> Result<()> {
        let config = load_or_default(Some(&path))?;
        if !path.exists() {
            println!("# {} 不存在，显示默认配置", path.display());
        }
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(path: PathBuf) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("配置文件不存在: {}", path.display());
        }
        let config = BridgeConfig::load_from_file(&path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        config.validate().context("配置无效")?;
        println!("✅ 配置有效: {}", path.display());
        println!("  IMU 地址: 0x{:02X}", config.imu.primary_address);
        println!("  静默超时: {} ms", config.imu.silence_timeout_ms);
        println!("  中继地址: 0x{:02X}", config.relay.slave_address);
        println!("  保留字节: {:?}", config.relay.extension);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_ends_with_yawlink_config() {
        if let Ok(path) = default_config_path() {
            assert!(path.ends_with("yawlink/config.toml"));
        }
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        ConfigCommand::init_(path.clone(), false).unwrap();
        assert!(ConfigCommand::init_(path.clone(), false).is_err());
        ConfigCommand::init_(path.clone(), true).unwrap();
        ConfigCommand::check_(path).unwrap();
    }

    #[test]
    fn test_invalid_file_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[imu]\nsilence_timeout_ms = 0\n").unwrap();

        assert!(ConfigCommand::check_(path.clone()).is_err());
        assert!(load_or_default(Some(&path)).is_err());
    }
}
