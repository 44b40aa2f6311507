//! 设备模型
//!
//! 缓存设备状态，并提供改变状态的语义操作。每个操作要么成功并更新缓存，
//! 要么失败且缓存保持不变。

use crate::dispatcher::Dispatcher;
use crate::error::DriverError;
use crate::state::{FocuserState, Limits};
use dreamfocuser_protocol::{
    Direction, EnvironmentFeedback, FirmwareVersion, ModeFeedback, MotionFeedback, Opcode,
    PositionFeedback, STEP_SIZE,
};
use dreamfocuser_serial::SerialTransport;
use tracing::{debug, info, warn};

/// DreamFocuser 设备模型
pub struct DreamFocuser<T: SerialTransport> {
    dispatcher: Dispatcher<T>,
    state: FocuserState,
    limits: Limits,
}

impl<T: SerialTransport> DreamFocuser<T> {
    /// 使用默认限位和 5 秒读取截止时间
    pub fn new(transport: T) -> Self {
        Self::with_dispatcher(Dispatcher::new(transport), Limits::default())
    }

    pub fn with_dispatcher(dispatcher: Dispatcher<T>, limits: Limits) -> Self {
        Self {
            dispatcher,
            state: FocuserState::default(),
            limits,
        }
    }

    pub fn state(&self) -> &FocuserState {
        &self.state
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<T> {
        &mut self.dispatcher
    }

    pub fn transport(&self) -> &T {
        self.dispatcher.transport()
    }

    /// 连接握手
    ///
    /// 状态对（'I' + 'W'）必须成功；固件版本尽力读取。
    pub fn connect(&mut self) -> Result<(), DriverError> {
        self.read_status()?;

        match self.read_version() {
            Ok(version) => info!("DreamFocuser firmware {}", version),
            Err(e) => warn!("Failed to read firmware version [{}]: {}", e.kind(), e),
        }
        Ok(())
    }

    /// 'P'：读取当前位置
    pub fn read_position(&mut self) -> Result<i32, DriverError> {
        let frame = self.dispatcher.exchange(Opcode::ReadPosition, 0)?;
        let feedback = PositionFeedback::try_from(frame)?;
        self.state.position = Some(feedback.position);
        Ok(feedback.position)
    }

    /// 'I'：是否在运动
    pub fn read_motion(&mut self) -> Result<bool, DriverError> {
        let frame = self.dispatcher.exchange(Opcode::IsMoving, 0)?;
        let feedback = MotionFeedback::try_from(frame)?;
        self.state.is_moving = feedback.moving;
        Ok(feedback.moving)
    }

    /// 'W'：是否处于绝对模式
    pub fn read_mode(&mut self) -> Result<bool, DriverError> {
        let frame = self.dispatcher.exchange(Opcode::IsAbsolute, 0)?;
        let feedback = ModeFeedback::try_from(frame)?;
        self.state.is_absolute = feedback.absolute;
        Ok(feedback.absolute)
    }

    /// 状态对：先 'I' 后 'W'，任一失败即返回错误
    pub fn read_status(&mut self) -> Result<(), DriverError> {
        self.read_motion()?;
        self.read_mode()?;
        Ok(())
    }

    /// 'T'：温度和湿度
    pub fn read_environment(&mut self) -> Result<EnvironmentFeedback, DriverError> {
        let frame = self.dispatcher.exchange(Opcode::ReadEnvironment, 0)?;
        let feedback = EnvironmentFeedback::try_from(frame)?;
        self.state.apply_environment(&feedback);
        Ok(feedback)
    }

    /// 'V'：固件版本
    pub fn read_version(&mut self) -> Result<FirmwareVersion, DriverError> {
        let frame = self.dispatcher.exchange(Opcode::FirmwareVersion, 0)?;
        let version = FirmwareVersion::try_from(frame)?;
        self.state.firmware = Some(version);
        Ok(version)
    }

    /// 'M'：移动到绝对位置
    ///
    /// 越界目标在发送前被拒绝。成功要求设备回显的负载等于 `target`。
    /// 缓存位置不更新，由后续 'P' 读取观察。
    pub fn set_absolute(&mut self, target: i32) -> Result<(), DriverError> {
        self.limits.check_absolute(i64::from(target))?;
        warn_unaligned("target", i64::from(target));

        info!("Moving to position {}", target);
        let frame = self.dispatcher.exchange(Opcode::MoveAbsolute, target)?;
        check_echo(target, frame.payload_i32())
    }

    /// 'Z'：把当前物理位置同步为 `position`
    ///
    /// 成功后设备进入绝对模式，调用方应重新读取 'W'。
    pub fn sync(&mut self, position: i32) -> Result<(), DriverError> {
        info!("Syncing to position {}", position);
        let frame = self.dispatcher.exchange(Opcode::Calibrate, position)?;
        check_echo(position, frame.payload_i32())
    }

    /// 'G'：停放
    pub fn park(&mut self) -> Result<(), DriverError> {
        self.dispatcher.exchange(Opcode::Park, 0)?;
        Ok(())
    }

    /// 'H'：停止运动
    pub fn abort(&mut self) -> Result<(), DriverError> {
        self.dispatcher.exchange(Opcode::Stop, 0)?;
        Ok(())
    }

    /// 相对移动
    ///
    /// 目标 = 缓存位置 ± `ticks`，然后委托给 [`set_absolute`](Self::set_absolute)。
    /// 缓存可能已过期（其他操作者移动过调焦器），此时目标会偏差相应的量。
    ///
    /// # 返回
    /// 发送的绝对目标位置
    pub fn move_relative(&mut self, direction: Direction, ticks: u32) -> Result<i32, DriverError> {
        self.limits.check_relative(ticks)?;
        warn_unaligned("relative step", i64::from(ticks));

        let position = self.state.position.ok_or(DriverError::PositionUnknown)?;
        let target = i64::from(position) + direction.sign() * i64::from(ticks);
        self.limits.check_absolute(target)?;

        let target = i32::try_from(target).map_err(|_| DriverError::OutOfRange {
            target,
            limit: self.limits.max_absolute,
        })?;
        self.set_absolute(target)?;
        Ok(target)
    }

    /// 断开：尽力发送 'H'，然后关闭传输
    pub fn disconnect(&mut self) {
        if let Err(e) = self.abort() {
            debug!("Abort on disconnect failed [{}]: {}", e.kind(), e);
        }
        self.close();
    }

    /// 关闭传输但不发送 'H'
    ///
    /// 设备会继续执行已接受的运动命令。用于下达命令后立即退出的场景。
    pub fn close(&mut self) {
        let transport = self.dispatcher.transport_mut();
        transport.close();
        info!("Disconnected from {}", transport.name());
    }

    pub fn into_transport(self) -> T {
        self.dispatcher.into_transport()
    }
}

fn check_echo(expected: i32, actual: i32) -> Result<(), DriverError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DriverError::EchoMismatch { expected, actual })
    }
}

fn warn_unaligned(what: &str, value: i64) {
    if value % i64::from(STEP_SIZE) != 0 {
        warn!("{} {} is not a multiple of the {}-tick step", what, value, STEP_SIZE);
    }
}
