//! 操作码定义
//!
//! 每个操作码都是一个 ASCII 字母，设备成功时在响应中原样回显。

use crate::ProtocolError;

/// 请求负载的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// 负载固定为 0（`a=b=c=d=0`）
    None,
    /// 只使用 `d`，`a,b,c = 0`
    LowByte,
    /// 四个字节承载有符号 32 位值（大端）
    Signed32,
}

/// 协议操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// 'M' 移动到绝对位置
    MoveAbsolute = 0x4D,
    /// 'H' 停止
    Stop = 0x48,
    /// 'P' 读取位置
    ReadPosition = 0x50,
    /// 'I' 查询是否在运动
    IsMoving = 0x49,
    /// 'T' 读取温度/湿度
    ReadEnvironment = 0x54,
    /// 'R' 按速度运动
    MoveAtSpeed = 0x52,
    /// 'W' 查询绝对/相对模式
    IsAbsolute = 0x57,
    /// 'Z' 校准到指定位置（sync）
    Calibrate = 0x5A,
    /// 'V' 固件版本
    FirmwareVersion = 0x56,
    /// 'G' 停靠（park）
    Park = 0x47,
}

impl Opcode {
    /// 全部操作码
    pub const ALL: [Opcode; 10] = [
        Opcode::MoveAbsolute,
        Opcode::Stop,
        Opcode::ReadPosition,
        Opcode::IsMoving,
        Opcode::ReadEnvironment,
        Opcode::MoveAtSpeed,
        Opcode::IsAbsolute,
        Opcode::Calibrate,
        Opcode::FirmwareVersion,
        Opcode::Park,
    ];

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self.into()
    }

    /// 对应的 ASCII 字符（用于日志）
    pub fn as_char(self) -> char {
        self.as_u8() as char
    }

    /// 请求负载的编码方式
    pub fn payload_kind(self) -> PayloadKind {
        match self {
            Opcode::MoveAbsolute | Opcode::Calibrate => PayloadKind::Signed32,
            Opcode::MoveAtSpeed => PayloadKind::LowByte,
            Opcode::Stop
            | Opcode::ReadPosition
            | Opcode::IsMoving
            | Opcode::ReadEnvironment
            | Opcode::IsAbsolute
            | Opcode::FirmwareVersion
            | Opcode::Park => PayloadKind::None,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.as_u8() == value)
            .ok_or(ProtocolError::UnknownOpcode { code: value })
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'", self.as_char())
    }
}
