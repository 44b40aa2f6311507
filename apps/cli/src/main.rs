//! # DreamFocuser CLI
//!
//! Command-line interface for the DreamFocuser focuser controller.
//!
//! 每个命令独立执行：读取配置 → 连接 → 执行操作 → 释放串口（已下达的运动继续执行）。
//!
//! ```bash
//! # 配置默认串口
//! dreamfocuser-cli config set --port /dev/ttyACM0
//!
//! # 移动到绝对位置并等待到位
//! dreamfocuser-cli goto 12800 --wait
//!
//! # 向内相对移动 160 步
//! dreamfocuser-cli move in 160
//!
//! # 无硬件时使用模拟设备
//! dreamfocuser-cli --simulate monitor --count 10
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod modes;

use commands::{ConfigCommand, GotoCommand, MonitorCommand, MoveCommand, SyncCommand};
use modes::oneshot::{OneShotMode, Overrides};

/// DreamFocuser CLI - 调焦器命令行工具
#[derive(Parser, Debug)]
#[command(name = "dreamfocuser-cli")]
#[command(about = "Command-line interface for the DreamFocuser focuser", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口设备（覆盖配置）
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// 使用模拟设备
    #[arg(long, global = true)]
    simulate: bool,

    /// 配置文件路径（默认位于用户配置目录）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 查询运动状态、模式和环境读数
    Status,

    /// 查询当前位置
    Position,

    /// 查询固件版本
    Version,

    /// 移动到绝对位置
    Goto {
        #[command(flatten)]
        args: GotoCommand,
    },

    /// 相对移动
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 把当前物理位置同步为指定值
    Sync {
        #[command(flatten)]
        args: SyncCommand,
    },

    /// 停放
    Park,

    /// 停止运动
    Abort,

    /// 周期轮询并显示属性更新
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dreamfocuser=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        config: cli.config,
        port: cli.port,
        simulate: cli.simulate,
    };

    run(cli.command, &overrides)
}

fn run(command: Commands, overrides: &Overrides) -> Result<()> {
    match command {
        // 配置管理不连接设备
        Commands::Config(cmd) => cmd.execute(overrides),
        Commands::Status => OneShotMode::new(overrides)?.status(),
        Commands::Position => OneShotMode::new(overrides)?.position(),
        Commands::Version => OneShotMode::new(overrides)?.version(),
        Commands::Goto { args } => OneShotMode::new(overrides)?.goto(args),
        Commands::Move { args } => OneShotMode::new(overrides)?.move_relative(args),
        Commands::Sync { args } => OneShotMode::new(overrides)?.sync(args),
        Commands::Park => OneShotMode::new(overrides)?.park(),
        Commands::Abort => OneShotMode::new(overrides)?.abort(),
        Commands::Monitor { args } => OneShotMode::new(overrides)?.monitor(args),
    }
}
