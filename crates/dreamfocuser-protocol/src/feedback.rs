//! 响应帧解析
//!
//! 每种响应都通过 `TryFrom<FocuserFrame>` 解析，操作码不符时返回
//! `ProtocolError::UnexpectedOpcode`。

use crate::constants::{MAX_SPEED, SPEED_DIRECTION_BIT};
use crate::control::Direction;
use crate::frame::FocuserFrame;
use crate::opcode::Opcode;
use crate::{ProtocolError, bytes_to_i16_be, bytes_to_u16_be};

/// 摄氏度到开尔文的偏移
pub const KELVIN_OFFSET: f64 = 273.15;

fn expect_opcode(frame: &FocuserFrame, opcode: Opcode) -> Result<(), ProtocolError> {
    if frame.command == opcode.as_u8() {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedOpcode {
            expected: opcode.as_u8(),
            actual: frame.command,
        })
    }
}

/// 'P' 位置反馈（有符号 32 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionFeedback {
    pub position: i32,
}

impl TryFrom<FocuserFrame> for PositionFeedback {
    type Error = ProtocolError;

    fn try_from(frame: FocuserFrame) -> Result<Self, Self::Error> {
        expect_opcode(&frame, Opcode::ReadPosition)?;
        Ok(Self {
            position: frame.payload_i32(),
        })
    }
}

/// 'I' 运动状态反馈
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionFeedback {
    pub moving: bool,
}

impl TryFrom<FocuserFrame> for MotionFeedback {
    type Error = ProtocolError;

    fn try_from(frame: FocuserFrame) -> Result<Self, Self::Error> {
        expect_opcode(&frame, Opcode::IsMoving)?;
        Ok(Self {
            moving: frame.flag(),
        })
    }
}

/// 'W' 绝对/相对模式反馈
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFeedback {
    /// true: 绝对模式（已校准）；false: 相对模式
    pub absolute: bool,
}

impl TryFrom<FocuserFrame> for ModeFeedback {
    type Error = ProtocolError;

    fn try_from(frame: FocuserFrame) -> Result<Self, Self::Error> {
        expect_opcode(&frame, Opcode::IsAbsolute)?;
        Ok(Self {
            absolute: frame.flag(),
        })
    }
}

/// 'T' 环境反馈
///
/// - `a,b`: 湿度 × 10（无符号）
/// - `c,d`: 温度（°C）× 10（有符号，补码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentFeedback {
    pub humidity_raw: u16,
    pub temperature_raw: i16,
}

impl EnvironmentFeedback {
    /// 相对湿度（%）
    pub fn humidity_percent(&self) -> f64 {
        f64::from(self.humidity_raw) / 10.0
    }

    /// 温度（°C）
    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature_raw) / 10.0
    }

    /// 温度（K）
    pub fn temperature_kelvin(&self) -> f64 {
        self.temperature_celsius() + KELVIN_OFFSET
    }

    /// 由物理量构造原始值（用于模拟设备）
    pub fn from_values(temperature_celsius: f64, humidity_percent: f64) -> Self {
        Self {
            humidity_raw: (humidity_percent * 10.0).round().clamp(0.0, f64::from(u16::MAX)) as u16,
            temperature_raw: (temperature_celsius * 10.0)
                .round()
                .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16,
        }
    }

    /// 编码为负载字节
    pub fn to_data(self) -> [u8; 4] {
        let h = self.humidity_raw.to_be_bytes();
        let t = self.temperature_raw.to_be_bytes();
        [h[0], h[1], t[0], t[1]]
    }
}

impl TryFrom<FocuserFrame> for EnvironmentFeedback {
    type Error = ProtocolError;

    fn try_from(frame: FocuserFrame) -> Result<Self, Self::Error> {
        expect_opcode(&frame, Opcode::ReadEnvironment)?;
        Ok(Self {
            humidity_raw: bytes_to_u16_be([frame.data[0], frame.data[1]]),
            temperature_raw: bytes_to_i16_be([frame.data[2], frame.data[3]]),
        })
    }
}

/// 'V' 固件版本（`c.d`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl TryFrom<FocuserFrame> for FirmwareVersion {
    type Error = ProtocolError;

    fn try_from(frame: FocuserFrame) -> Result<Self, Self::Error> {
        expect_opcode(&frame, Opcode::FirmwareVersion)?;
        Ok(Self {
            major: frame.data[2],
            minor: frame.data[3],
        })
    }
}

/// 'R' 速度运动回显
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedFeedback {
    pub direction: Direction,
    pub speed: u8,
}

impl TryFrom<FocuserFrame> for SpeedFeedback {
    type Error = ProtocolError;

    fn try_from(frame: FocuserFrame) -> Result<Self, Self::Error> {
        expect_opcode(&frame, Opcode::MoveAtSpeed)?;
        let d = frame.low_byte();
        let direction = if d & SPEED_DIRECTION_BIT != 0 {
            Direction::Inward
        } else {
            Direction::Outward
        };
        Ok(Self {
            direction,
            speed: d & MAX_SPEED,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_feedback() {
        let frame = FocuserFrame::response(Opcode::ReadPosition, [0x00, 0x01, 0xF4, 0x00]);
        let feedback = PositionFeedback::try_from(frame).unwrap();
        assert_eq!(feedback.position, 128_000);

        let frame = FocuserFrame::response(Opcode::ReadPosition, [0xFF, 0xFF, 0xFF, 0xE0]);
        assert_eq!(PositionFeedback::try_from(frame).unwrap().position, -32);
    }

    #[test]
    fn test_position_feedback_wrong_opcode() {
        let frame = FocuserFrame::response(Opcode::IsMoving, [0, 0, 0, 1]);
        assert_eq!(
            PositionFeedback::try_from(frame),
            Err(ProtocolError::UnexpectedOpcode {
                expected: b'P',
                actual: b'I'
            })
        );
    }

    #[test]
    fn test_environment_feedback() {
        // 湿度 0x0352 = 85.0%，温度 0xFFEC = -2.0°C
        let bytes = FocuserFrame::response(Opcode::ReadEnvironment, [0x03, 0x52, 0xFF, 0xEC])
            .encode();
        let frame = FocuserFrame::decode(&bytes).unwrap();
        let env = EnvironmentFeedback::try_from(frame).unwrap();
        assert!((env.humidity_percent() - 85.0).abs() < 1e-9);
        assert!((env.temperature_celsius() + 2.0).abs() < 1e-9);
        assert!((env.temperature_kelvin() - 271.15).abs() < 1e-9);
    }

    #[test]
    fn test_environment_temperature_is_signed() {
        let frame = FocuserFrame::response(Opcode::ReadEnvironment, [0, 0, 0xFF, 0xFF]);
        let env = EnvironmentFeedback::try_from(frame).unwrap();
        assert!((env.temperature_kelvin() - (-0.1 + 273.15)).abs() < 1e-9);
    }

    #[test]
    fn test_environment_from_values() {
        let env = EnvironmentFeedback::from_values(20.0, 1.0);
        assert_eq!(env.temperature_raw, 200);
        assert_eq!(env.humidity_raw, 10);
        assert_eq!(env.to_data(), [0x00, 0x0A, 0x00, 0xC8]);
    }

    #[test]
    fn test_firmware_version() {
        let frame = FocuserFrame::response(Opcode::FirmwareVersion, [0, 0, 2, 7]);
        let version = FirmwareVersion::try_from(frame).unwrap();
        assert_eq!(version, FirmwareVersion { major: 2, minor: 7 });
        assert_eq!(version.to_string(), "2.7");
    }

    #[test]
    fn test_speed_feedback() {
        let frame = FocuserFrame::response(Opcode::MoveAtSpeed, [0, 0, 0, 0x8A]);
        let feedback = SpeedFeedback::try_from(frame).unwrap();
        assert_eq!(feedback.direction, Direction::Inward);
        assert_eq!(feedback.speed, 10);
    }

    #[test]
    fn test_flags() {
        let moving = FocuserFrame::response(Opcode::IsMoving, [0, 0, 0, 1]);
        assert!(MotionFeedback::try_from(moving).unwrap().moving);

        let relative = FocuserFrame::response(Opcode::IsAbsolute, [0, 0, 0, 0]);
        assert!(!ModeFeedback::try_from(relative).unwrap().absolute);
    }
}
