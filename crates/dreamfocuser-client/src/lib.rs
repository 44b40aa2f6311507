//! 客户端接口模块
//!
//! 本模块在驱动层之上提供宿主框架使用的接口，包括：
//! - 轮询状态机（[`FocuserController::tick`]，默认每 500 ms 调用一次）
//! - 用户可见的操作状态（IDLE / OK / BUSY / ALERT）
//! - 属性发布（[`PropertySink`]）
//! - 持久化设置（TOML）
//! - 进程级设备句柄（[`device()`]）
//!
//! # 示例
//!
//! ```no_run
//! use dreamfocuser_client::{FocuserController, FocuserSettings, LogSink};
//!
//! let settings = FocuserSettings::default();
//! let focuser = settings.builder().build().unwrap();
//! let mut controller = FocuserController::new(focuser, LogSink);
//!
//! controller.move_absolute(12_800).unwrap();
//! loop {
//!     controller.tick();
//!     std::thread::sleep(settings.poll_interval());
//! }
//! ```

pub mod controller;
pub mod device;
pub mod property;
pub mod settings;

pub use controller::{DEFAULT_RELATIVE_STEP, FocuserController};
pub use device::{BoxedSink, DeviceController, DeviceError, DeviceHandle, device};
pub use property::{LogSink, PropertySink, PropertyState, PropertyUpdate, RecordingSink};
pub use settings::{DEFAULT_POLL_INTERVAL_MS, FocuserSettings, MAX_READ_TIMEOUT_MS, SettingsError};

// 重新导出常用的下层类型
pub use dreamfocuser_driver::{BoxedTransport, DreamFocuser, DriverError, ErrorKind, Limits};
pub use dreamfocuser_protocol::{Direction, FirmwareVersion};
