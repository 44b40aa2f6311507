//! 轮询状态机
//!
//! [`FocuserController::tick`] 由宿主按固定周期（默认 500 ms）调用，刷新缓存状态，
//! 并把设备报告的状态（运动中、绝对模式、位置）转换为用户可见的操作状态。
//!
//! # 状态
//!
//! | 属性 | 取值 | 含义 |
//! |---|---|---|
//! | 绝对位置 | IDLE / OK / BUSY / ALERT | 未下达过运动命令 / 已到位 / 运动中 / 读取失败 |
//! | 环境 | OK / BUSY / ALERT | 读数未变 / 读数变化 / 读取失败 |
//! | 总体 | OK / ALERT | 状态对（'I' + 'W'）读取成功 / 失败 |
//!
//! 所有入口都要求 `&mut self`：同一时刻只有一次设备交换，
//! 用户操作不会与 `tick()` 交错。

use crate::property::{PropertySink, PropertyState, PropertyUpdate};
use dreamfocuser_driver::{DreamFocuser, DriverError, Limits, validate_limit};
use dreamfocuser_protocol::{Direction, STEP_SIZE};
use dreamfocuser_serial::SerialTransport;
use tracing::{error, info, warn};

/// 默认相对移动步数（5 × 32）
pub const DEFAULT_RELATIVE_STEP: u32 = 160;

/// 调焦器控制器：设备模型 + 轮询状态机 + 属性发布
pub struct FocuserController<T: SerialTransport, S: PropertySink> {
    focuser: DreamFocuser<T>,
    sink: S,
    abs_status: PropertyState,
    env_status: PropertyState,
    overall_status: PropertyState,
    /// 上一次发布的环境读数
    reported_environment: (Option<f64>, Option<f64>),
    relative_step: u32,
}

impl<T: SerialTransport, S: PropertySink> FocuserController<T, S> {
    /// 在已连接的设备上创建控制器
    ///
    /// 初始状态：绝对位置 IDLE，环境 OK，总体 OK。
    pub fn new(focuser: DreamFocuser<T>, sink: S) -> Self {
        Self {
            focuser,
            sink,
            abs_status: PropertyState::Idle,
            env_status: PropertyState::Ok,
            overall_status: PropertyState::Ok,
            reported_environment: (None, None),
            relative_step: DEFAULT_RELATIVE_STEP,
        }
    }

    pub fn focuser(&self) -> &DreamFocuser<T> {
        &self.focuser
    }

    pub fn focuser_mut(&mut self) -> &mut DreamFocuser<T> {
        &mut self.focuser
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn abs_status(&self) -> PropertyState {
        self.abs_status
    }

    pub fn env_status(&self) -> PropertyState {
        self.env_status
    }

    pub fn overall_status(&self) -> PropertyState {
        self.overall_status
    }

    pub fn limits(&self) -> Limits {
        self.focuser.limits()
    }

    /// 最近一次相对移动的步数
    pub fn relative_step(&self) -> u32 {
        self.relative_step
    }

    /// 一次轮询
    ///
    /// 1. 记录旧的绝对位置状态和位置
    /// 2. 读取状态对；失败时总体 ALERT 并跳到第 6 步
    /// 3. 运动中 → BUSY；否则非 IDLE → OK
    /// 4. 读取环境；失败 ALERT，读数变化 BUSY，否则 OK
    /// 5. 非 IDLE 时读取位置：变化 BUSY，不变 OK，失败 ALERT
    /// 6. 状态或位置变化时发布绝对位置；总是发布环境和状态
    pub fn tick(&mut self) {
        let old_status = self.abs_status;
        let old_position = self.focuser.state().position;

        match self.focuser.read_status() {
            Ok(()) => {
                self.overall_status = PropertyState::Ok;
                self.update_motion_status();
                self.refresh_environment();
                self.refresh_position(old_position);
            },
            Err(e) => {
                error!("Failed to read focuser status [{}]: {}", e.kind(), e);
                self.overall_status = PropertyState::Alert;
                if e.is_transport() {
                    self.abs_status = PropertyState::Alert;
                    self.env_status = PropertyState::Alert;
                }
            },
        }

        if self.abs_status != old_status || self.focuser.state().position != old_position {
            self.publish_absolute();
        }
        self.publish_environment();
        self.publish_status();
    }

    fn update_motion_status(&mut self) {
        if self.focuser.state().is_moving {
            self.abs_status = PropertyState::Busy;
        } else if self.abs_status != PropertyState::Idle {
            self.abs_status = PropertyState::Ok;
        }
    }

    fn refresh_environment(&mut self) {
        match self.focuser.read_environment() {
            Ok(_) => {
                let state = self.focuser.state();
                let current = (state.temperature_kelvin, state.humidity_percent);
                self.env_status = if current != self.reported_environment {
                    PropertyState::Busy
                } else {
                    PropertyState::Ok
                };
            },
            Err(e) => {
                error!("Failed to read environment [{}]: {}", e.kind(), e);
                self.env_status = PropertyState::Alert;
            },
        }
    }

    fn refresh_position(&mut self, old_position: Option<i32>) {
        if self.abs_status == PropertyState::Idle {
            return;
        }

        match self.focuser.read_position() {
            Ok(position) => {
                self.abs_status = if Some(position) != old_position {
                    PropertyState::Busy
                } else {
                    PropertyState::Ok
                };
            },
            Err(e) => {
                error!("Failed to read position [{}]: {}", e.kind(), e);
                self.abs_status = PropertyState::Alert;
            },
        }
    }

    /// 移动到绝对位置
    pub fn move_absolute(&mut self, target: i32) -> Result<(), DriverError> {
        let result = self.focuser.set_absolute(target);
        match &result {
            Ok(()) => self.finish_motion_command(),
            Err(e) => {
                error!("Failed to move to position {} [{}]: {}", target, e.kind(), e);
                self.abs_status = PropertyState::Alert;
                self.publish_absolute();
            },
        }
        result
    }

    /// 相对移动
    ///
    /// # 返回
    /// 发送的绝对目标位置
    pub fn move_relative(&mut self, direction: Direction, ticks: u32) -> Result<i32, DriverError> {
        let result = self.focuser.move_relative(direction, ticks);
        let state = match &result {
            Ok(_) => {
                self.relative_step = ticks;
                PropertyState::Ok
            },
            Err(e) => {
                error!("Relative move of {} ticks failed [{}]: {}", ticks, e.kind(), e);
                PropertyState::Alert
            },
        };

        self.sink.publish(PropertyUpdate::RelativePosition { ticks, state });
        if result.is_ok() {
            self.finish_motion_command();
        }
        result
    }

    /// 把当前物理位置同步为 `position`
    ///
    /// 成功后重新读取模式（尽力而为）。
    pub fn sync(&mut self, position: i32) -> Result<(), DriverError> {
        let result = self.focuser.sync(position);
        let state = match &result {
            Ok(()) => {
                if let Err(e) = self.focuser.read_mode() {
                    warn!("Failed to re-read mode after sync [{}]: {}", e.kind(), e);
                }
                PropertyState::Ok
            },
            Err(e) => {
                error!("Sync failed [{}]: {}", e.kind(), e);
                PropertyState::Alert
            },
        };

        self.sink.publish(PropertyUpdate::Sync { state });
        if result.is_ok() {
            self.finish_motion_command();
            self.publish_status();
        }
        result
    }

    pub fn park(&mut self) -> Result<(), DriverError> {
        let result = self.focuser.park();
        let state = match &result {
            Ok(()) => {
                info!("Focuser parked");
                PropertyState::Ok
            },
            Err(e) => {
                error!("Park failed [{}]: {}", e.kind(), e);
                PropertyState::Alert
            },
        };

        self.sink.publish(PropertyUpdate::Park { state });
        if result.is_ok() {
            self.finish_motion_command();
        }
        result
    }

    /// 停止运动
    ///
    /// 不改变绝对位置状态，下一次 `tick()` 会观察到运动停止。
    pub fn abort(&mut self) -> Result<(), DriverError> {
        let result = self.focuser.abort();
        let state = match &result {
            Ok(()) => {
                info!("Focusing aborted");
                PropertyState::Ok
            },
            Err(e) => {
                error!("Abort failed [{}]: {}", e.kind(), e);
                PropertyState::Alert
            },
        };

        self.sink.publish(PropertyUpdate::Abort { state });
        result
    }

    /// 读取固件版本并发布
    pub fn read_version(&mut self) -> Result<(), DriverError> {
        let firmware = self.focuser.read_version()?;
        self.sink.publish(PropertyUpdate::Version { firmware });
        Ok(())
    }

    /// 修改绝对位置限位（`[1, 500000]`）
    pub fn set_max_absolute(&mut self, value: u32) -> Result<(), DriverError> {
        let max_absolute = validate_limit("max_absolute", value)?;
        let limits = Limits {
            max_absolute,
            ..self.focuser.limits()
        };
        self.apply_limits(limits);
        Ok(())
    }

    /// 修改相对移动限位（`[1, 500000]`）
    pub fn set_max_relative(&mut self, value: u32) -> Result<(), DriverError> {
        let max_relative = validate_limit("max_relative", value)?;
        let limits = Limits {
            max_relative,
            ..self.focuser.limits()
        };
        self.apply_limits(limits);
        Ok(())
    }

    fn apply_limits(&mut self, limits: Limits) {
        self.focuser.set_limits(limits);
        info!(
            "Focuser absolute limits: min ({}) max ({})",
            limits.min_position(),
            limits.max_position()
        );
        self.sink.publish(PropertyUpdate::Limits {
            max_absolute: limits.max_absolute,
            max_relative: limits.max_relative,
            step: STEP_SIZE,
        });
    }

    /// 断开：尽力停止并关闭传输，返回属性接收端
    pub fn disconnect(mut self) -> S {
        self.focuser.disconnect();
        self.sink
    }

    /// 释放：只关闭传输，已下达的运动继续执行
    pub fn release(mut self) -> S {
        self.focuser.close();
        self.sink
    }

    /// 运动命令被设备接受：绝对位置 OK 并发布
    ///
    /// 失败时只有发出命令的那个属性进入 ALERT。
    fn finish_motion_command(&mut self) {
        self.abs_status = PropertyState::Ok;
        self.publish_absolute();
    }

    fn publish_absolute(&mut self) {
        self.sink.publish(PropertyUpdate::AbsolutePosition {
            position: self.focuser.state().position,
            state: self.abs_status,
        });
    }

    fn publish_environment(&mut self) {
        let state = self.focuser.state();
        let temperature_kelvin = state.temperature_kelvin;
        let humidity_percent = state.humidity_percent;
        self.reported_environment = (temperature_kelvin, humidity_percent);
        self.sink.publish(PropertyUpdate::Environment {
            temperature_kelvin,
            humidity_percent,
            state: self.env_status,
        });
    }

    fn publish_status(&mut self) {
        let state = self.focuser.state();
        let update = PropertyUpdate::Status {
            synchronized: state.is_absolute,
            moving: state.is_moving,
            state: self.overall_status,
        };
        self.sink.publish(update);
    }
}
