//! 配置管理命令
//!
//! 用于管理 CLI 配置（串口、限位、轮询周期等）

use anyhow::{Context, Result};
use clap::Subcommand;
use dreamfocuser_client::FocuserSettings;
use std::path::PathBuf;

use crate::modes::oneshot::Overrides;

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("dreamfocuser");
    path.push("config.toml");
    Ok(path)
}

/// 配置文件路径（命令行参数优先）
pub fn config_file(overrides: &Overrides) -> Result<PathBuf> {
    match &overrides.config {
        Some(path) => Ok(path.clone()),
        None => default_config_file(),
    }
}

/// 加载配置（文件不存在时使用默认值）
pub fn load_settings(overrides: &Overrides) -> Result<FocuserSettings> {
    let path = config_file(overrides)?;
    FocuserSettings::load_or_default(&path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认串口设备（如 /dev/ttyACM0）
        #[arg(long)]
        port: Option<String>,

        /// 波特率
        #[arg(long)]
        baud_rate: Option<u32>,

        /// 默认使用模拟设备
        #[arg(long)]
        simulation: Option<bool>,

        /// 绝对位置限位 [1, 500000]
        #[arg(long)]
        max_absolute: Option<u32>,

        /// 相对移动限位 [1, 500000]
        #[arg(long)]
        max_relative: Option<u32>,

        /// 默认相对移动步数
        #[arg(long)]
        relative_step: Option<u32>,

        /// 轮询周期（毫秒）
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, overrides: &Overrides) -> Result<()> {
        match self {
            ConfigCommand::Set {
                port,
                baud_rate,
                simulation,
                max_absolute,
                max_relative,
                relative_step,
                poll_interval_ms,
            } => {
                let path = config_file(overrides)?;
                let mut settings = load_settings(overrides)?;

                if let Some(port) = port {
                    println!("✅ 设置默认串口: {}", port);
                    settings.port = port;
                }
                if let Some(baud_rate) = baud_rate {
                    println!("✅ 设置波特率: {}", baud_rate);
                    settings.baud_rate = baud_rate;
                }
                if let Some(simulation) = simulation {
                    println!("✅ 设置模拟模式: {}", simulation);
                    settings.simulation = simulation;
                }
                if let Some(max_absolute) = max_absolute {
                    println!("✅ 设置绝对位置限位: {}", max_absolute);
                    settings.max_absolute = max_absolute;
                }
                if let Some(max_relative) = max_relative {
                    println!("✅ 设置相对移动限位: {}", max_relative);
                    settings.max_relative = max_relative;
                }
                if let Some(relative_step) = relative_step {
                    println!("✅ 设置默认相对步数: {}", relative_step);
                    settings.relative_step = relative_step;
                }
                if let Some(poll_interval_ms) = poll_interval_ms {
                    println!("✅ 设置轮询周期: {} ms", poll_interval_ms);
                    settings.poll_interval_ms = poll_interval_ms;
                }

                settings.save(&path).context("写入配置文件失败")?;
                Ok(())
            },

            ConfigCommand::Get { key } => {
                let settings = load_settings(overrides)?;
                match key.as_str() {
                    "port" => println!("{}", settings.port),
                    "baud_rate" => println!("{}", settings.baud_rate),
                    "simulation" => println!("{}", settings.simulation),
                    "max_absolute" => println!("{}", settings.max_absolute),
                    "max_relative" => println!("{}", settings.max_relative),
                    "relative_step" => println!("{}", settings.relative_step),
                    "poll_interval_ms" => println!("{}", settings.poll_interval_ms),
                    _ => print_settings(&settings),
                }
                Ok(())
            },

            ConfigCommand::Check => {
                let path = config_file(overrides)?;
                println!("配置文件: {}", path.display());
                if !path.exists() {
                    println!("  (不存在，使用默认配置)");
                }

                let settings = load_settings(overrides)?;
                print_settings(&settings);
                println!("✅ 配置有效");
                Ok(())
            },
        }
    }
}

fn print_settings(settings: &FocuserSettings) {
    println!("DreamFocuser CLI 配置:");
    println!("  串口: {} ({} baud)", settings.port, settings.baud_rate);
    println!("  模拟模式: {}", settings.simulation);
    println!("  绝对位置限位: ±{}", settings.max_absolute);
    println!("  相对移动限位: {}", settings.max_relative);
    println!("  默认相对步数: {}", settings.relative_step);
    println!("  轮询周期: {} ms", settings.poll_interval_ms);
}
