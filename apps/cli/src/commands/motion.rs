//! 运动命令参数
//!
//! 绝对移动、相对移动和同步

use anyhow::Result;
use clap::{Args, ValueEnum};
use dreamfocuser_client::{DeviceController, Direction};
use std::time::Duration;

/// `--wait` 的默认超时（秒）
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 120;

/// 相对移动方向
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    /// 向内（位置减小）
    In,
    /// 向外（位置增大）
    Out,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::In => Direction::Inward,
            DirectionArg::Out => Direction::Outward,
        }
    }
}

/// 绝对移动参数
#[derive(Args, Debug)]
pub struct GotoCommand {
    /// 目标位置（步，应为 32 的倍数）
    #[arg(allow_hyphen_values = true)]
    pub position: i32,

    /// 轮询直到到位
    #[arg(short, long)]
    pub wait: bool,

    /// 等待到位的最长时间（秒）
    #[arg(long, default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl GotoCommand {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn execute(&self, controller: &mut DeviceController) -> Result<()> {
        println!("🎯 移动到位置 {}...", self.position);
        controller.move_absolute(self.position)?;
        println!("✅ 命令已确认");
        Ok(())
    }
}

/// 相对移动参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 方向
    #[arg(value_enum)]
    pub direction: DirectionArg,

    /// 步数（默认使用配置中的相对步数）
    pub ticks: Option<u32>,

    /// 轮询直到到位
    #[arg(short, long)]
    pub wait: bool,

    /// 等待到位的最长时间（秒）
    #[arg(long, default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl MoveCommand {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn execute(&self, controller: &mut DeviceController, default_ticks: u32) -> Result<()> {
        let ticks = self.ticks.unwrap_or(default_ticks);

        // 相对移动基于最近一次读到的位置
        let position = controller.focuser_mut().read_position()?;
        println!("📍 当前位置: {}", position);

        let target = controller.move_relative(self.direction.into(), ticks)?;
        println!("✅ 相对移动 {} 步 → 目标 {}", ticks, target);
        Ok(())
    }
}

/// 同步参数
#[derive(Args, Debug)]
pub struct SyncCommand {
    /// 当前物理位置的新值
    #[arg(default_value_t = 0, allow_hyphen_values = true)]
    pub position: i32,
}

impl SyncCommand {
    pub fn execute(&self, controller: &mut DeviceController) -> Result<()> {
        println!("🔄 同步到位置 {}...", self.position);
        controller.sync(self.position)?;
        println!("✅ 同步完成（绝对模式）");
        Ok(())
    }
}
