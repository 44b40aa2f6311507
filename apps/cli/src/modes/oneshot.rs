//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置（命令行参数覆盖文件）
//! 2. 通过进程级设备句柄连接调焦器
//! 3. 执行操作
//! 4. 释放串口（不发送停止命令，已下达的运动继续执行）

use anyhow::Result;
use dreamfocuser_client::{
    DeviceController, DeviceHandle, FocuserSettings, LogSink, PropertySink, PropertyState, device,
};
use std::path::PathBuf;
use tracing::debug;

use crate::commands::config::load_settings;
use crate::commands::monitor::{ConsoleSink, wait_until_settled};
use crate::commands::{GotoCommand, MonitorCommand, MoveCommand, SyncCommand};

/// 命令行全局参数
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// 配置文件路径
    pub config: Option<PathBuf>,
    /// 串口设备
    pub port: Option<String>,
    /// 使用模拟设备
    pub simulate: bool,
}

impl Overrides {
    /// 把命令行参数应用到配置上
    pub fn apply(&self, settings: &mut FocuserSettings) {
        if let Some(port) = &self.port {
            settings.port = port.clone();
        }
        if self.simulate {
            settings.simulation = true;
        }
    }
}

/// One-shot 模式
pub struct OneShotMode {
    settings: FocuserSettings,
}

impl OneShotMode {
    /// 加载配置并应用命令行覆盖
    pub fn new(overrides: &Overrides) -> Result<Self> {
        let mut settings = load_settings(overrides)?;
        overrides.apply(&mut settings);
        settings.validate()?;
        Ok(Self { settings })
    }

    /// 连接，执行 `op`，然后释放串口
    fn with_device<R>(
        &self,
        sink: Box<dyn PropertySink + Send>,
        op: impl FnOnce(&mut DeviceHandle) -> Result<R>,
    ) -> Result<R> {
        let mut handle = device().lock();
        handle.release();
        handle.configure(self.settings.clone())?;

        if self.settings.simulation {
            println!("🔌 连接到模拟调焦器...");
        } else {
            println!("🔌 连接到调焦器 {}...", self.settings.port);
        }
        handle.connect_with_sink(sink)?;
        println!("✅ 已连接");

        let result = op(&mut handle);
        handle.release();
        debug!("One-shot command finished, device released");
        result
    }

    /// 在已连接的控制器上执行操作（属性更新写入日志）
    fn with_controller<R>(&self, op: impl FnOnce(&mut DeviceController) -> Result<R>) -> Result<R> {
        self.with_device(Box::new(LogSink), |handle| op(handle.controller()?))
    }

    pub fn status(&mut self) -> Result<()> {
        self.with_controller(|controller| {
            let focuser = controller.focuser_mut();
            focuser.read_status()?;
            let environment = focuser.read_environment()?;
            let state = focuser.state();

            println!("📊 调焦器状态:");
            println!("  模式: {}", if state.is_absolute { "绝对（已同步）" } else { "相对" });
            println!("  运动: {}", if state.is_moving { "运动中" } else { "静止" });
            println!(
                "  温度: {:.1} °C ({:.2} K)",
                environment.temperature_celsius(),
                environment.temperature_kelvin()
            );
            println!("  湿度: {:.1} %", environment.humidity_percent());
            Ok(())
        })
    }

    pub fn position(&mut self) -> Result<()> {
        self.with_controller(|controller| {
            let position = controller.focuser_mut().read_position()?;
            println!("📍 当前位置: {}", position);
            Ok(())
        })
    }

    pub fn version(&mut self) -> Result<()> {
        self.with_controller(|controller| {
            let version = controller.focuser_mut().read_version()?;
            println!("ℹ️ 固件版本: {}", version);
            Ok(())
        })
    }

    pub fn goto(&mut self, args: GotoCommand) -> Result<()> {
        let interval = self.settings.poll_interval();
        self.with_device(Box::new(LogSink), |handle| {
            args.execute(handle.controller()?)?;
            if args.wait {
                let state = wait_until_settled(handle, interval, args.wait_timeout())?;
                report_settled(state, handle)?;
            }
            Ok(())
        })
    }

    pub fn move_relative(&mut self, args: MoveCommand) -> Result<()> {
        let interval = self.settings.poll_interval();
        let default_ticks = self.settings.relative_step;
        self.with_device(Box::new(LogSink), |handle| {
            args.execute(handle.controller()?, default_ticks)?;
            if args.wait {
                let state = wait_until_settled(handle, interval, args.wait_timeout())?;
                report_settled(state, handle)?;
            }
            Ok(())
        })
    }

    pub fn sync(&mut self, args: SyncCommand) -> Result<()> {
        self.with_controller(|controller| args.execute(controller))
    }

    pub fn park(&mut self) -> Result<()> {
        self.with_controller(|controller| {
            println!("🅿️ 停放...");
            controller.park()?;
            println!("✅ 已停放");
            Ok(())
        })
    }

    pub fn abort(&mut self) -> Result<()> {
        self.with_controller(|controller| {
            println!("🛑 停止运动...");
            controller.abort()?;
            println!("✅ 已停止");
            Ok(())
        })
    }

    pub fn monitor(&mut self, args: MonitorCommand) -> Result<()> {
        let interval = self.settings.poll_interval();
        self.with_device(Box::new(ConsoleSink), |handle| args.execute(handle, interval))
    }
}

fn report_settled(state: PropertyState, handle: &mut DeviceHandle) -> Result<()> {
    let position = handle.controller()?.focuser().state().position;
    match (state, position) {
        (PropertyState::Alert, _) => anyhow::bail!("❌ 运动过程中读取失败"),
        (_, Some(position)) => println!("✅ 已到位: {}", position),
        (_, None) => println!("✅ 运动结束"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut settings = FocuserSettings::default();
        Overrides {
            config: None,
            port: Some("/dev/ttyUSB9".to_string()),
            simulate: true,
        }
        .apply(&mut settings);

        assert_eq!(settings.port, "/dev/ttyUSB9");
        assert!(settings.simulation);
    }

    #[test]
    fn test_empty_overrides_keep_settings() {
        let mut settings = FocuserSettings::default();
        Overrides::default().apply(&mut settings);
        assert_eq!(settings, FocuserSettings::default());
    }
}
