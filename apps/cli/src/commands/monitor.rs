//! 监控命令
//!
//! 按轮询周期调用 `tick()`，直到 Ctrl+C 或达到指定次数。

use anyhow::{Context, Result};
use clap::Args;
use dreamfocuser_client::{DeviceHandle, PropertySink, PropertyState, PropertyUpdate};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 轮询次数（默认一直运行）
    #[arg(short, long)]
    pub count: Option<u64>,

    /// 轮询周期（毫秒，覆盖配置）
    #[arg(short, long)]
    pub interval_ms: Option<u64>,
}

impl MonitorCommand {
    pub fn execute(&self, handle: &mut DeviceHandle, default_interval: Duration) -> Result<()> {
        let interval = self.interval_ms.map(Duration::from_millis).unwrap_or(default_interval);

        println!("📊 监控中 (每 {} ms)...", interval.as_millis());
        println!("按 Ctrl+C 停止\n");

        // 设置 Ctrl+C 处理
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("设置 Ctrl+C 处理失败")?;

        let mut ticks = 0u64;
        while running.load(Ordering::SeqCst) {
            handle.tick();
            ticks += 1;

            if self.count.is_some_and(|count| ticks >= count) {
                break;
            }
            std::thread::sleep(interval);
        }

        println!("\n✅ 监控结束（{} 次轮询）", ticks);
        Ok(())
    }
}

/// 轮询直到绝对位置状态离开 BUSY
///
/// 每次轮询前先等待一个周期，给设备时间开始运动。超过 `timeout` 仍为 BUSY 时返回错误。
///
/// # 返回
/// 最终状态（OK、IDLE 或 ALERT）
pub fn wait_until_settled(
    handle: &mut DeviceHandle,
    interval: Duration,
    timeout: Duration,
) -> Result<PropertyState> {
    let started = Instant::now();
    loop {
        std::thread::sleep(interval);
        handle.tick();
        let state = handle.controller()?.abs_status();
        if state != PropertyState::Busy {
            return Ok(state);
        }
        if started.elapsed() >= timeout {
            anyhow::bail!("⏱️ 等待到位超时（{:.1} 秒）", timeout.as_secs_f64());
        }
    }
}

/// 把属性更新打印到终端
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl PropertySink for ConsoleSink {
    fn publish(&mut self, update: PropertyUpdate) {
        println!("{}", format_update(&update));
    }
}

fn badge(state: PropertyState) -> &'static str {
    match state {
        PropertyState::Idle => "⚪",
        PropertyState::Ok => "🟢",
        PropertyState::Busy => "🟡",
        PropertyState::Alert => "🔴",
    }
}

fn format_option<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// 属性更新的单行文本
pub fn format_update(update: &PropertyUpdate) -> String {
    match update {
        PropertyUpdate::AbsolutePosition { position, state } => {
            format!("{} 位置: {} [{}]", badge(*state), format_option(*position), state)
        },
        PropertyUpdate::RelativePosition { ticks, state } => {
            format!("{} 相对移动: {} 步 [{}]", badge(*state), ticks, state)
        },
        PropertyUpdate::Environment {
            temperature_kelvin,
            humidity_percent,
            state,
        } => format!(
            "{} 温度: {} K  湿度: {} % [{}]",
            badge(*state),
            format_option(temperature_kelvin.map(|t| format!("{:.2}", t))),
            format_option(humidity_percent.map(|h| format!("{:.1}", h))),
            state
        ),
        PropertyUpdate::Status {
            synchronized,
            moving,
            state,
        } => format!(
            "{} 状态: {}  {} [{}]",
            badge(*state),
            if *synchronized { "已同步" } else { "未同步" },
            if *moving { "运动中" } else { "静止" },
            state
        ),
        PropertyUpdate::Sync { state } => format!("{} 同步 [{}]", badge(*state), state),
        PropertyUpdate::Park { state } => format!("{} 停放 [{}]", badge(*state), state),
        PropertyUpdate::Abort { state } => format!("{} 停止 [{}]", badge(*state), state),
        PropertyUpdate::Limits {
            max_absolute,
            max_relative,
            step,
        } => format!("⚙️ 限位: ±{}  相对 {}  步进 {}", max_absolute, max_relative, step),
        PropertyUpdate::Version { firmware } => format!("ℹ️ 固件版本: {}", firmware),
    }
}
