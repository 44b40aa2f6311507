//! 请求帧构建
//!
//! 调焦方向和 'R'（按速度运动）命令的负载编码。

use crate::constants::{MAX_SPEED, SPEED_DIRECTION_BIT};
use crate::frame::FocuserFrame;
use crate::opcode::Opcode;

/// 调焦方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// 向内（位置减小）
    Inward,
    /// 向外（位置增大）
    Outward,
}

impl Direction {
    /// 方向符号：Inward = -1，Outward = +1
    pub fn sign(self) -> i64 {
        match self {
            Direction::Inward => -1,
            Direction::Outward => 1,
        }
    }
}

/// 构建 `R`（按速度运动）命令的 `d` 字节
///
/// bit 7 为方向（INWARD 置 1），bits 0..6 为速度（超出 127 时截断到 127）。
pub fn speed_payload(direction: Direction, speed: u8) -> u8 {
    let speed = speed.min(MAX_SPEED);
    match direction {
        Direction::Inward => speed | SPEED_DIRECTION_BIT,
        Direction::Outward => speed,
    }
}

/// 'R' 按速度运动
pub fn move_at_speed(direction: Direction, speed: u8) -> FocuserFrame {
    FocuserFrame::request(
        Opcode::MoveAtSpeed,
        i32::from(speed_payload(direction, speed)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_payload() {
        assert_eq!(speed_payload(Direction::Outward, 50), 50);
        assert_eq!(speed_payload(Direction::Inward, 50), 0x80 | 50);
        assert_eq!(speed_payload(Direction::Outward, 200), 127);
        assert_eq!(speed_payload(Direction::Inward, 255), 0xFF);
    }

    #[test]
    fn test_move_at_speed_frame() {
        let frame = move_at_speed(Direction::Inward, 10);
        assert_eq!(frame.data, [0, 0, 0, 0x8A]);
        assert_eq!(frame.command, b'R');
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Inward.sign(), -1);
        assert_eq!(Direction::Outward.sign(), 1);
    }
}
