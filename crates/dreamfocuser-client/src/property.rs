//! 属性状态与发布接口
//!
//! 控制器不直接面向宿主框架，而是把每次可观察的变化作为 [`PropertyUpdate`]
//! 交给 [`PropertySink`]，由宿主决定如何展示。

use dreamfocuser_protocol::FirmwareVersion;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 用户可见的操作状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyState::Idle => "IDLE",
            PropertyState::Ok => "OK",
            PropertyState::Busy => "BUSY",
            PropertyState::Alert => "ALERT",
        }
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次属性更新
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyUpdate {
    /// 绝对位置（显示最近一次 'P'）
    AbsolutePosition {
        position: Option<i32>,
        state: PropertyState,
    },
    /// 相对移动
    RelativePosition { ticks: u32, state: PropertyState },
    /// 温度（K）和湿度（%）
    Environment {
        temperature_kelvin: Option<f64>,
        humidity_percent: Option<f64>,
        state: PropertyState,
    },
    /// 状态标志：`synchronized` 即绝对模式
    Status {
        synchronized: bool,
        moving: bool,
        state: PropertyState,
    },
    Sync { state: PropertyState },
    Park { state: PropertyState },
    Abort { state: PropertyState },
    /// 限位变化后的位置范围，`step` 为位置字段的步进粒度
    Limits {
        max_absolute: u32,
        max_relative: u32,
        step: u32,
    },
    Version { firmware: FirmwareVersion },
}

/// 属性发布接口
pub trait PropertySink {
    fn publish(&mut self, update: PropertyUpdate);
}

impl<S: PropertySink + ?Sized> PropertySink for Box<S> {
    fn publish(&mut self, update: PropertyUpdate) {
        (**self).publish(update)
    }
}

/// 通过 `tracing` 输出属性更新
///
/// 状态为 ALERT 的更新用 `warn!`，用户动作用 `info!`，周期性遥测用 `debug!`。
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PropertySink for LogSink {
    fn publish(&mut self, update: PropertyUpdate) {
        match &update {
            PropertyUpdate::AbsolutePosition {
                state: PropertyState::Alert,
                ..
            }
            | PropertyUpdate::RelativePosition {
                state: PropertyState::Alert,
                ..
            }
            | PropertyUpdate::Environment {
                state: PropertyState::Alert,
                ..
            }
            | PropertyUpdate::Status {
                state: PropertyState::Alert,
                ..
            } => warn!("{:?}", update),
            PropertyUpdate::AbsolutePosition { .. }
            | PropertyUpdate::Environment { .. }
            | PropertyUpdate::Status { .. } => debug!("{:?}", update),
            _ => info!("{:?}", update),
        }
    }
}

/// 记录全部更新（克隆体共享同一份记录）
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    updates: Arc<Mutex<Vec<PropertyUpdate>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<PropertyUpdate> {
        self.updates.lock().clone()
    }

    /// 取出并清空已记录的更新
    pub fn take(&self) -> Vec<PropertyUpdate> {
        std::mem::take(&mut *self.updates.lock())
    }

    /// 已发布的绝对位置更新 `(position, state)`
    pub fn absolute_positions(&self) -> Vec<(Option<i32>, PropertyState)> {
        self.updates
            .lock()
            .iter()
            .filter_map(|update| match update {
                PropertyUpdate::AbsolutePosition { position, state } => Some((*position, *state)),
                _ => None,
            })
            .collect()
    }
}

impl PropertySink for RecordingSink {
    fn publish(&mut self, update: PropertyUpdate) {
        self.updates.lock().push(update);
    }
}
