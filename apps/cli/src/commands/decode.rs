//! 中继载荷编解码命令

use anyhow::{Context, Result};
use clap::Args;
use yawlink_protocol::{RELAY_PAYLOAD_LEN, RelayPayload, SIGNAL_GREEN, SIGNAL_NONE, SIGNAL_RED};

/// 解码命令参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// 十六进制载荷（允许空格、`0x` 前缀，如 "d7 11 06 00 00"）
    pub hex: String,

    /// 按 obstacle_x 扩展解释保留字节
    #[arg(long)]
    pub obstacle_x: bool,
}

/// 编码命令参数
#[derive(Args, Debug)]
pub struct EncodeCommand {
    /// 累计航向（度）
    #[arg(long, allow_hyphen_values = true)]
    pub yaw: f64,

    /// 信号字节
    #[arg(long, default_value_t = SIGNAL_NONE)]
    pub signal: u8,

    /// 保留字节中放入的障碍物 x 偏移
    #[arg(long, allow_hyphen_values = true)]
    pub obstacle_x: Option<i16>,
}

/// 把用户输入规整为连续的十六进制串
fn normalize_hex(input: &str) -> String {
    input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_start_matches("0x").trim_start_matches("0X"))
        .collect()
}

/// 解析十六进制载荷
pub fn parse_payload_hex(input: &str) -> Result<RelayPayload> {
    let bytes = hex::decode(normalize_hex(input)).context("无效的十六进制输入")?;
    let payload = RelayPayload::decode(&bytes)
        .with_context(|| format!("载荷必须为 {} 字节", RELAY_PAYLOAD_LEN))?;
    Ok(payload)
}

fn signal_name(signal: u8) -> &'static str {
    match signal {
        SIGNAL_RED => "red",
        SIGNAL_GREEN => "green",
        SIGNAL_NONE => "none",
        _ => "unknown",
    }
}

impl DecodeCommand {
    pub fn execute(&self) -> Result<()> {
        let payload = parse_payload_hex(&self.hex)?;
        println!("yaw:      {:.2}° ({} centi)", payload.yaw_deg(), payload.yaw_centi);
        println!("signal:   {} ({})", payload.signal, signal_name(payload.signal));
        if self.obstacle_x {
            println!("obstacle: x = {}", payload.reserved_i16());
        } else {
            println!("reserved: {}", hex::encode(payload.reserved));
        }
        Ok(())
    }
}

impl EncodeCommand {
    pub fn execute(&self) -> Result<()> {
        if !self.yaw.is_finite() {
            anyhow::bail!("航向必须是有限值");
        }
        let mut payload = RelayPayload::from_degrees(self.yaw, self.signal);
        if let Some(x) = self.obstacle_x {
            payload = payload.with_obstacle_x(x);
        }
        println!("{}", hex::encode(payload.encode()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spaced_hex() {
        let payload = parse_payload_hex("d7 11 06 00 00").unwrap();
        assert_eq!(payload.yaw_centi, 4567);
        assert_eq!(payload.signal, 6);
    }

    #[test]
    fn test_parse_prefixed_hex() {
        let payload = parse_payload_hex("0x18,0xFC,0x01,0x00,0x00").unwrap();
        assert_eq!(payload.yaw_centi, -1000);
        assert_eq!(signal_name(payload.signal), "red");
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(parse_payload_hex("d7 11 06").is_err());
        assert!(parse_payload_hex("zz").is_err());
    }
}
