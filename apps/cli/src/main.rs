//! # yawlink CLI
//!
//! Host-side tooling for the yawlink heading bridge.
//!
//! ```bash
//! # 在 mock 硬件上运行桥接器，模拟 45°/s 转动并在第 5 秒拔掉 IMU 2 秒
//! yawlink-cli simulate --rate 45 --dropout-at 5 --dropout-for 2
//!
//! # 检查视觉传感器的串口抓包
//! yawlink-cli parse capture.txt
//!
//! # 解码主机读到的 5 字节载荷
//! yawlink-cli decode "d7 11 06 00 00"
//!
//! # 生成默认配置文件
//! yawlink-cli config init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, DecodeCommand, EncodeCommand, ParseCommand, SimulateCommand};

/// yawlink CLI - 航向桥接器命令行工具
#[derive(Parser, Debug)]
#[command(name = "yawlink-cli")]
#[command(about = "Host-side tooling for the yawlink heading bridge", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 在 mock 硬件上运行桥接器
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 解析视觉传感器的文本行
    Parse {
        #[command(flatten)]
        args: ParseCommand,
    },

    /// 解码 5 字节中继载荷
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },

    /// 编码 5 字节中继载荷
    Encode {
        #[command(flatten)]
        args: EncodeCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                // 前缀匹配所有 yawlink_* crate
                .add_directive("yawlink=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { args } => args.execute().await,
        Commands::Parse { args } => args.execute(),
        Commands::Decode { args } => args.execute(),
        Commands::Encode { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
