//! 驱动层模块
//!
//! 本模块提供 DreamFocuser 调焦器的设备驱动功能，包括：
//! - 命令分发（同步请求/响应，操作码回显校验，帧重同步）
//! - 设备模型（缓存状态 + 语义操作：移动、同步、停放、停止、遥测读取）
//! - 限位检查（绝对位置 `[-max, +max]`，相对步数 `[0, max]`）
//! - 模拟设备（无硬件时的内存实现）
//!
//! # 使用场景
//!
//! 适用于直接发送命令、自行管理轮询的场景。
//! 需要属性状态（IDLE/OK/BUSY/ALERT）和周期轮询时，使用 `dreamfocuser-client`。

mod builder;
pub mod dispatcher;
mod error;
pub mod focuser;
pub mod simulation;
pub mod state;

pub use builder::{BoxedTransport, FocuserBuilder};
pub use dispatcher::Dispatcher;
pub use error::{DriverError, ErrorKind};
pub use focuser::DreamFocuser;
pub use simulation::SimulatedTransport;
pub use state::{FocuserState, Limits, MAX_LIMIT, MIN_LIMIT, validate_limit};
