//! # DreamFocuser Protocol
//!
//! DreamFocuser 串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义（帧长度、标记字节、步长等）
//! - `opcode`: 操作码枚举
//! - `frame`: 8 字节帧的编码/解码与校验和
//! - `control`: 请求帧构建
//! - `feedback`: 响应帧解析
//!
//! ## 帧格式
//!
//! ```text
//! offset:  0    1    2    3    4    5    6    7
//!         'M'   k    a    b    c    d    n    z
//! ```
//!
//! - `a..d`: 32 位负载，Motorola (MSB) 高位在前（大端字节序）
//! - `n`: 固定为 0x00
//! - `z`: 校验和，`(M + k + a + b + c + d + n) mod 256`
//!
//! 本模块提供了字节序转换工具函数。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod frame;
pub mod opcode;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use frame::{FocuserFrame, checksum, find_frame};
pub use opcode::{Opcode, PayloadKind};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 收到的字节数不是完整的一帧
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    Malformed { expected: usize, actual: usize },

    /// 帧首字节不是 'M'
    #[error("Malformed frame: invalid marker byte 0x{value:02X}")]
    InvalidMarker { value: u8 },

    /// 校验和不匹配
    #[error("Bad checksum: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadChecksum { expected: u8, actual: u8 },

    /// 设备回复 '!'：无法识别的命令
    #[error("Device reported unrecognized command")]
    DeviceUnknownCommand,

    /// 设备回复 '?'：设备端校验和错误
    #[error("Device reported bad checksum")]
    DeviceBadChecksum,

    /// 操作码不在协议表内，拒绝编码
    #[error("Unknown opcode: 0x{code:02X}")]
    UnknownOpcode { code: u8 },

    /// 响应帧类型与解析目标不符
    #[error("Unexpected opcode: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedOpcode { expected: u8, actual: u8 },
}

/// 字节序转换工具函数
///
/// 协议使用 Motorola (MSB) 高位在前（大端字节序），
/// 这些函数用于在协议层进行字节序转换。
///
/// 大端字节序转 i32
pub fn bytes_to_i32_be(bytes: [u8; 4]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// i32 转大端字节序
pub fn i32_to_bytes_be(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}
