//! Builder 模式实现
//!
//! 提供链式构造已连接 `DreamFocuser` 实例的便捷方式。

use crate::dispatcher::Dispatcher;
use crate::error::DriverError;
use crate::focuser::DreamFocuser;
use crate::simulation::SimulatedTransport;
use crate::state::Limits;
use dreamfocuser_protocol::{DEFAULT_BAUD_RATE, DEFAULT_PORT, RESPONSE_TIMEOUT};
use dreamfocuser_serial::{SerialPortTransport, SerialTransport};
use std::time::Duration;
use tracing::info;

/// 装箱的传输（真实串口或模拟设备）
pub type BoxedTransport = Box<dyn SerialTransport + Send>;

/// DreamFocuser Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use dreamfocuser_driver::FocuserBuilder;
///
/// let mut focuser = FocuserBuilder::new()
///     .port("/dev/ttyUSB0")
///     .build()
///     .unwrap();
/// let position = focuser.read_position().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FocuserBuilder {
    /// 串口设备路径
    port: String,
    baud_rate: u32,
    /// 每次交换的读取截止时间
    read_timeout: Duration,
    /// 使用内存模拟设备代替串口
    simulation: bool,
    /// 模拟设备报告的模式
    simulated_absolute: bool,
    limits: Limits,
}

impl Default for FocuserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FocuserBuilder {
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: RESPONSE_TIMEOUT,
            simulation: false,
            simulated_absolute: true,
            limits: Limits::default(),
        }
    }

    /// 设置串口路径（默认 "/dev/ttyACM0"）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// 设置波特率（默认 9600）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// 设置读取截止时间（默认 5 秒）
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn simulation(mut self, enabled: bool) -> Self {
        self.simulation = enabled;
        self
    }

    pub fn simulated_absolute(mut self, absolute: bool) -> Self {
        self.simulated_absolute = absolute;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// 打开传输并完成连接握手
    ///
    /// # Errors
    /// - `DriverError::Serial`: 串口打开失败（`IO_OPEN`）
    /// - 状态对（'I' + 'W'）失败时连接中止，传输被关闭
    pub fn build(self) -> Result<DreamFocuser<BoxedTransport>, DriverError> {
        let transport: BoxedTransport = if self.simulation {
            info!("Simulation mode enabled");
            Box::new(SimulatedTransport::new(self.simulated_absolute))
        } else {
            Box::new(SerialPortTransport::open(&self.port, self.baud_rate)?)
        };

        self.connect(transport)
    }

    /// 在给定传输上完成连接握手
    pub fn connect<T: SerialTransport>(self, transport: T) -> Result<DreamFocuser<T>, DriverError> {
        let dispatcher = Dispatcher::with_read_timeout(transport, self.read_timeout);
        let mut focuser = DreamFocuser::with_dispatcher(dispatcher, self.limits);

        if let Err(e) = focuser.connect() {
            focuser.dispatcher_mut().transport_mut().close();
            return Err(e);
        }

        info!("DreamFocuser connected on {}", focuser.transport().name());
        Ok(focuser)
    }
}
