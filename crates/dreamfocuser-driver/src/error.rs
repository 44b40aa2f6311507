//! 驱动层错误类型定义

use dreamfocuser_protocol::ProtocolError;
use dreamfocuser_serial::SerialError;
use std::fmt;
use thiserror::Error;

/// 错误类别
///
/// 按层级划分：传输（`IO_*`）、编解码、设备上报、协议、语义。
/// `Display` 输出大写下划线名称，用于日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IoOpen,
    IoWrite,
    IoRead,
    IoReadTimeout,
    Malformed,
    BadChecksum,
    DeviceUnknownCmd,
    DeviceBadChecksum,
    OpcodeMismatch,
    EchoMismatch,
    OutOfRange,
    UnknownOpcode,
    PositionUnknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::IoOpen => "IO_OPEN",
            ErrorKind::IoWrite => "IO_WRITE",
            ErrorKind::IoRead => "IO_READ",
            ErrorKind::IoReadTimeout => "IO_READ_TIMEOUT",
            ErrorKind::Malformed => "MALFORMED",
            ErrorKind::BadChecksum => "BAD_CHECKSUM",
            ErrorKind::DeviceUnknownCmd => "DEVICE_UNKNOWN_CMD",
            ErrorKind::DeviceBadChecksum => "DEVICE_BAD_CHECKSUM",
            ErrorKind::OpcodeMismatch => "OPCODE_MISMATCH",
            ErrorKind::EchoMismatch => "ECHO_MISMATCH",
            ErrorKind::OutOfRange => "OUT_OF_RANGE",
            ErrorKind::UnknownOpcode => "UNKNOWN_OPCODE",
            ErrorKind::PositionUnknown => "POSITION_UNKNOWN",
        }
    }

    /// 是否为传输层错误（`IO_*`）
    pub fn is_transport(self) -> bool {
        matches!(
            self,
            ErrorKind::IoOpen | ErrorKind::IoWrite | ErrorKind::IoRead | ErrorKind::IoReadTimeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 协议解析错误（包括设备哨兵响应）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 响应操作码既不是请求操作码也不是哨兵
    #[error("Opcode mismatch: sent 0x{expected:02X}, device answered 0x{actual:02X}")]
    OpcodeMismatch { expected: u8, actual: u8 },

    /// 'M' / 'Z' 回显的负载与请求不符
    #[error("Echo mismatch: sent {expected}, device echoed {actual}")]
    EchoMismatch { expected: i32, actual: i32 },

    /// 目标位置超出 `[-max, +max]`
    #[error("Target {target} outside [-{limit}, {limit}]")]
    OutOfRange { target: i64, limit: u32 },

    /// 相对移动步数超过上限
    #[error("Relative move of {ticks} ticks exceeds limit {limit}")]
    RelativeOutOfRange { ticks: u32, limit: u32 },

    /// 限位属性超出允许范围
    #[error("Invalid {name} {value}: must be within [{min}, {max}]")]
    InvalidLimit {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// 尚未读到位置，无法计算相对移动目标
    #[error("Position unknown: read the position before a relative move")]
    PositionUnknown,
}

impl DriverError {
    /// 错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Serial(e) => match e {
                SerialError::Open { .. } => ErrorKind::IoOpen,
                SerialError::Write(_)
                | SerialError::ShortWrite { .. }
                | SerialError::Flush(_)
                | SerialError::Closed => ErrorKind::IoWrite,
                SerialError::Read(_) => ErrorKind::IoRead,
                SerialError::Timeout => ErrorKind::IoReadTimeout,
            },
            DriverError::Protocol(e) => match e {
                ProtocolError::Malformed { .. } | ProtocolError::InvalidMarker { .. } => {
                    ErrorKind::Malformed
                },
                ProtocolError::BadChecksum { .. } => ErrorKind::BadChecksum,
                ProtocolError::DeviceUnknownCommand => ErrorKind::DeviceUnknownCmd,
                ProtocolError::DeviceBadChecksum => ErrorKind::DeviceBadChecksum,
                ProtocolError::UnknownOpcode { .. } => ErrorKind::UnknownOpcode,
                ProtocolError::UnexpectedOpcode { .. } => ErrorKind::OpcodeMismatch,
            },
            DriverError::OpcodeMismatch { .. } => ErrorKind::OpcodeMismatch,
            DriverError::EchoMismatch { .. } => ErrorKind::EchoMismatch,
            DriverError::OutOfRange { .. }
            | DriverError::RelativeOutOfRange { .. }
            | DriverError::InvalidLimit { .. } => ErrorKind::OutOfRange,
            DriverError::PositionUnknown => ErrorKind::PositionUnknown,
        }
    }

    /// 是否为传输层错误
    pub fn is_transport(&self) -> bool {
        self.kind().is_transport()
    }
}
