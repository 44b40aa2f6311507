//! 进程级设备句柄
//!
//! 每个进程一个设备实例，首次访问时创建。宿主入口通过 [`device()`]
//! 取得句柄并转发到它的方法。

use crate::controller::FocuserController;
use crate::property::{LogSink, PropertySink};
use crate::settings::FocuserSettings;
use dreamfocuser_driver::{BoxedTransport, DreamFocuser, DriverError};
use parking_lot::Mutex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

/// 装箱的属性接收端
pub type BoxedSink = Box<dyn PropertySink + Send>;

/// 句柄持有的控制器类型
pub type DeviceController = FocuserController<BoxedTransport, BoxedSink>;

/// 设备句柄错误
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Focuser is not connected")]
    NotConnected,

    #[error("Focuser is already connected; disconnect before changing settings")]
    AlreadyConnected,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// 设备句柄：设置 + 可选的已连接控制器
pub struct DeviceHandle {
    settings: FocuserSettings,
    controller: Option<DeviceController>,
}

impl DeviceHandle {
    pub fn new(settings: FocuserSettings) -> Self {
        Self {
            settings,
            controller: None,
        }
    }

    pub fn settings(&self) -> &FocuserSettings {
        &self.settings
    }

    /// 替换设置（仅在未连接时允许）
    pub fn configure(&mut self, settings: FocuserSettings) -> Result<(), DeviceError> {
        if self.controller.is_some() {
            return Err(DeviceError::AlreadyConnected);
        }
        self.settings = settings;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.controller.is_some()
    }

    /// 连接并使用 [`LogSink`] 发布属性
    pub fn connect(&mut self) -> Result<(), DeviceError> {
        self.connect_with_sink(Box::new(LogSink))
    }

    /// 连接（已连接时不做任何事）
    pub fn connect_with_sink(&mut self, sink: BoxedSink) -> Result<(), DeviceError> {
        if self.controller.is_some() {
            return Ok(());
        }

        let focuser = self.settings.builder().build()?;
        self.attach(focuser, sink)
    }

    /// 接管一个已打开的设备
    pub fn attach(
        &mut self,
        focuser: DreamFocuser<BoxedTransport>,
        sink: BoxedSink,
    ) -> Result<(), DeviceError> {
        if self.controller.is_some() {
            return Err(DeviceError::AlreadyConnected);
        }
        self.controller = Some(FocuserController::new(focuser, sink));
        Ok(())
    }

    /// 断开：停止运动并关闭串口（未连接时不做任何事）
    pub fn disconnect(&mut self) {
        if let Some(controller) = self.controller.take() {
            controller.disconnect();
            info!("DreamFocuser disconnected");
        }
    }

    /// 释放串口但不停止运动（未连接时不做任何事）
    pub fn release(&mut self) {
        if let Some(controller) = self.controller.take() {
            controller.release();
            info!("DreamFocuser released");
        }
    }

    /// 一次轮询（未连接时忽略）
    pub fn tick(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.tick();
        }
    }

    pub fn controller(&mut self) -> Result<&mut DeviceController, DeviceError> {
        self.controller.as_mut().ok_or(DeviceError::NotConnected)
    }

    /// 在已连接的控制器上执行一个操作
    pub fn with_controller<R>(
        &mut self,
        op: impl FnOnce(&mut DeviceController) -> Result<R, DriverError>,
    ) -> Result<R, DeviceError> {
        let controller = self.controller()?;
        Ok(op(controller)?)
    }
}

static DEVICE: OnceLock<Mutex<DeviceHandle>> = OnceLock::new();

/// 进程级设备句柄（首次调用时以默认设置创建）
pub fn device() -> &'static Mutex<DeviceHandle> {
    DEVICE.get_or_init(|| Mutex::new(DeviceHandle::new(FocuserSettings::default())))
}
