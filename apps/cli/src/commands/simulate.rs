//! 仿真命令
//!
//! 在 mock IMU / mock 串口上运行完整的桥接器：合成匀速转动的姿态采样、
//! 回放视觉抓包、按计划拔插 IMU，并以主机身份周期性读取中继载荷。

use crate::commands::config::load_or_default;
use anyhow::{Context, Result};
use clap::Args;
use rand::Rng;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use yawlink_driver::{BridgeBuilder, wrap180};
use yawlink_hal::mock::{MockImu, MockSerial};
use yawlink_protocol::RelayPayload;

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 仿真时长（秒），0 表示直到 Ctrl-C
    #[arg(short, long, default_value_t = 10.0)]
    pub duration: f64,

    /// 转动角速度（度/秒，负值为反向）
    #[arg(short, long, default_value_t = 45.0, allow_hyphen_values = true)]
    pub rate: f64,

    /// 姿态噪声幅度（度，均匀分布）
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// 视觉抓包文件（循环回放，每行间隔 `--vision-interval-ms`）
    #[arg(long)]
    pub vision: Option<PathBuf>,

    /// 视觉行回放间隔（毫秒）
    #[arg(long, default_value_t = 100)]
    pub vision_interval_ms: u64,

    /// 在第几秒拔掉 IMU
    #[arg(long)]
    pub dropout_at: Option<f64>,

    /// 拔掉多久（秒）
    #[arg(long, default_value_t = 2.0)]
    pub dropout_for: f64,

    /// 在第几秒由主机发送重置零点命令
    #[arg(long)]
    pub rezero_at: Option<f64>,

    /// 主机读取间隔（毫秒）
    #[arg(long, default_value_t = 500)]
    pub read_interval_ms: u64,

    /// 配置文件（默认 `<config_dir>/yawlink/config.toml`，不存在时使用默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// 主机侧解缠：相邻两次读取的差值按 16 位回绕解释
#[derive(Debug, Default)]
struct HostUnwrapper {
    last_centi: Option<i16>,
    total_centi: i64,
}

impl HostUnwrapper {
    fn push(&mut self, centi: i16) -> f64 {
        if let Some(last) = self.last_centi {
            self.total_centi += i64::from(centi.wrapping_sub(last));
        } else {
            self.total_centi = i64::from(centi);
        }
        self.last_centi = Some(centi);
        self.total_centi as f64 / 100.0
    }
}

impl SimulateCommand {
    fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            anyhow::bail!("--duration 必须是非负数");
        }
        if !self.rate.is_finite() || !self.noise.is_finite() || self.noise < 0.0 {
            anyhow::bail!("--rate/--noise 必须是有限值，且噪声非负");
        }
        if self.read_interval_ms == 0 || self.vision_interval_ms == 0 {
            anyhow::bail!("间隔必须大于 0");
        }
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        self.validate()?;
        let config = load_or_default(self.config.as_deref())?;
        let report_interval = config.imu.report_interval();

        let vision_lines: Vec<String> = match &self.vision {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("无法读取视觉抓包 {}", path.display()))?
                .lines()
                .map(str::to_owned)
                .collect(),
            None => Vec::new(),
        };

        let (imu, imu_ctl) = MockImu::new();
        let (serial, serial_ctl) = MockSerial::new();
        let bridge = BridgeBuilder::new()
            .config(config)
            .build_std(imu, serial)
            .context("启动桥接器失败")?;
        let relay = bridge.relay();
        info!("Relay responder at 0x{:02X}", relay.address());

        println!(
            "⏳ 仿真中：{:.1}°/s，{}",
            self.rate,
            if self.duration > 0.0 {
                format!("{:.1} 秒", self.duration)
            } else {
                "Ctrl-C 结束".to_string()
            }
        );

        let start = Instant::now();
        let mut rng = rand::thread_rng();
        let mut sample_tick = tokio::time::interval(report_interval);
        let mut vision_tick = tokio::time::interval(Duration::from_millis(self.vision_interval_ms));
        let mut read_tick = tokio::time::interval(Duration::from_millis(self.read_interval_ms));
        let deadline = (self.duration > 0.0).then(|| Duration::from_secs_f64(self.duration));
        let mut vision_cursor = 0usize;
        let mut unplugged = false;
        let mut rezero_sent = false;
        let mut host = HostUnwrapper::default();

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let elapsed = start.elapsed();
            if deadline.is_some_and(|d| elapsed >= d) {
                break;
            }
            let t = elapsed.as_secs_f64();

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Interrupted, stopping simulation");
                    break;
                }
                _ = sample_tick.tick() => {
                    let in_dropout = self
                        .dropout_at
                        .is_some_and(|at| t >= at && t < at + self.dropout_for);
                    if in_dropout != unplugged {
                        unplugged = in_dropout;
                        imu_ctl.set_present(!unplugged);
                        if unplugged {
                            warn!("Simulated IMU unplugged at {:.2}s", t);
                        } else {
                            info!("Simulated IMU plugged back at {:.2}s", t);
                        }
                    }
                    if !unplugged {
                        let noise = if self.noise > 0.0 {
                            rng.gen_range(-self.noise..=self.noise)
                        } else {
                            0.0
                        };
                        let yaw = wrap180(self.rate * t + noise);
                        imu_ctl.push_yaw(yaw as f32);
                    }

                    if !rezero_sent && self.rezero_at.is_some_and(|at| t >= at) {
                        rezero_sent = true;
                        println!("→ host: re-zero at {:.2}s", t);
                        relay.on_receive(&[0x01]);
                    }
                }
                _ = vision_tick.tick(), if !vision_lines.is_empty() => {
                    serial_ctl.push_line(&vision_lines[vision_cursor % vision_lines.len()]);
                    vision_cursor += 1;
                }
                _ = read_tick.tick() => {
                    let bytes = relay.on_request();
                    let payload = RelayPayload::decode(&bytes)?;
                    println!(
                        "{:>7.2}s  [{}]  yaw {:>8.2}°  host-unwrapped {:>9.2}°  signal {}  {}",
                        t,
                        hex_bytes(&bytes),
                        payload.yaw_deg(),
                        host.push(payload.yaw_centi),
                        payload.signal,
                        bridge.supervisor_state(),
                    );
                }
            }
        }

        let metrics = bridge.metrics();
        println!("--- metrics ---");
        println!(
            "samples: {} (rejected {}), signal lost: {}, recovery attempts: {} (failed {})",
            metrics.samples_total,
            metrics.samples_rejected,
            metrics.signal_lost_episodes,
            metrics.recovery_attempts,
            metrics.recovery_failures,
        );
        println!(
            "vision frames: {} ok / {} rejected, resyncs: {}, relay reads: {}",
            metrics.frames_ok, metrics.frames_rejected, metrics.vision_resyncs, metrics.relay_reads,
        );
        Ok(())
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
