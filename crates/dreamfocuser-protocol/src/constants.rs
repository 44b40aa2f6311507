//! 协议常量定义
//!
//! 集中定义所有协议相关的常量，避免在代码中散落"魔法数"。

use std::time::Duration;

/// 帧长度（请求和响应相同）
pub const FRAME_LEN: usize = 8;

/// 帧标记字节 'M'（两个方向都固定）
pub const FRAME_MARKER: u8 = 0x4D;

/// 保留字节 `n` 的固定值
pub const FRAME_RESERVED: u8 = 0x00;

/// 设备回复：无法识别的命令
pub const SENTINEL_UNKNOWN_COMMAND: u8 = b'!';

/// 设备回复：请求校验和错误
pub const SENTINEL_BAD_CHECKSUM: u8 = b'?';

/// 串口波特率（8N1，无流控）
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 默认串口设备路径
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// 单次响应读取的最长等待时间
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// 位置步长（电机微步数）
///
/// 所有位置字段都以此为步进；目标位置应为其整数倍（仅作提示，不强制）。
pub const STEP_SIZE: u32 = 32;

/// 速度模式下速度值的上限（`R` 命令 `d` 的低 7 位）
pub const MAX_SPEED: u8 = 0x7F;

/// 速度模式下的方向位（`R` 命令 `d` 的 bit 7）
pub const SPEED_DIRECTION_BIT: u8 = 0x80;
