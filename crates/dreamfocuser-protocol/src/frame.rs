//! 8 字节帧的编码/解码
//!
//! 帧按字节显式编码，不依赖任何结构体内存布局。

use crate::constants::*;
use crate::opcode::{Opcode, PayloadKind};
use crate::{ProtocolError, bytes_to_i32_be, i32_to_bytes_be};

/// 计算校验和
///
/// `z = (M + k + a + b + c + d + n) mod 256`，请求和响应使用同一公式。
pub fn checksum(head: &[u8; 7]) -> u8 {
    head.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// DreamFocuser 协议帧
///
/// 请求和响应共用同一结构。标记字节 `M` 和校验和 `z` 不保存，
/// 编码时写入 / 解码时校验。
///
/// # 示例
///
/// ```rust
/// use dreamfocuser_protocol::{FocuserFrame, Opcode};
///
/// let frame = FocuserFrame::request(Opcode::ReadPosition, 0);
/// assert_eq!(frame.encode(), [0x4D, 0x50, 0, 0, 0, 0, 0, 0x9D]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FocuserFrame {
    /// 操作码字节 `k`（响应中可能是哨兵 '!' / '?'）
    pub command: u8,

    /// 负载 `a, b, c, d`（大端）
    pub data: [u8; 4],

    /// 保留字节 `n`（协议规定为 0）
    pub reserved: u8,
}

impl FocuserFrame {
    /// 按操作码的负载规则构建请求帧
    ///
    /// - `H,P,I,T,W,G,V`: 负载忽略，全部为 0
    /// - `R`: 只使用 `payload` 的最低字节作为 `d`
    /// - `M,Z`: 四字节承载有符号 32 位值
    pub fn request(opcode: Opcode, payload: i32) -> Self {
        let data = match opcode.payload_kind() {
            PayloadKind::None => [0; 4],
            PayloadKind::LowByte => [0, 0, 0, (payload & 0xFF) as u8],
            PayloadKind::Signed32 => i32_to_bytes_be(payload),
        };

        Self {
            command: opcode.as_u8(),
            data,
            reserved: FRAME_RESERVED,
        }
    }

    /// 由原始操作码字节构建请求帧
    ///
    /// # 错误
    /// - `ProtocolError::UnknownOpcode`: 操作码不在协议表内（不会产生任何字节）
    pub fn request_raw(code: u8, payload: i32) -> Result<Self, ProtocolError> {
        let opcode = Opcode::try_from(code)?;
        Ok(Self::request(opcode, payload))
    }

    /// 帧头 7 字节（不含校验和）
    fn head(&self) -> [u8; 7] {
        [
            FRAME_MARKER,
            self.command,
            self.data[0],
            self.data[1],
            self.data[2],
            self.data[3],
            self.reserved,
        ]
    }

    /// 本帧的校验和
    pub fn checksum(&self) -> u8 {
        checksum(&self.head())
    }

    /// 编码为 8 字节
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let head = self.head();
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..7].copy_from_slice(&head);
        bytes[7] = checksum(&head);
        bytes
    }

    /// 结构校验：长度、标记字节、校验和
    ///
    /// 不检查哨兵响应，哨兵帧本身是结构合法的帧。
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != FRAME_LEN {
            return Err(ProtocolError::Malformed {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }

        if bytes[0] != FRAME_MARKER {
            return Err(ProtocolError::InvalidMarker { value: bytes[0] });
        }

        let frame = Self {
            command: bytes[1],
            data: [bytes[2], bytes[3], bytes[4], bytes[5]],
            reserved: bytes[6],
        };

        let expected = frame.checksum();
        if expected != bytes[7] {
            return Err(ProtocolError::BadChecksum {
                expected,
                actual: bytes[7],
            });
        }

        Ok(frame)
    }

    /// 解码响应帧
    ///
    /// 依次检查：长度 → 标记字节 → 校验和 → 设备哨兵（'!' / '?'）。
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let frame = Self::parse(bytes)?;
        match frame.command {
            SENTINEL_UNKNOWN_COMMAND => Err(ProtocolError::DeviceUnknownCommand),
            SENTINEL_BAD_CHECKSUM => Err(ProtocolError::DeviceBadChecksum),
            _ => Ok(frame),
        }
    }

    /// 负载按有符号 32 位大端解释
    pub fn payload_i32(&self) -> i32 {
        bytes_to_i32_be(self.data)
    }

    /// 负载最低字节 `d`
    pub fn low_byte(&self) -> u8 {
        self.data[3]
    }

    /// `d == 1` 的布尔标志（运动中 / 绝对模式）
    pub fn flag(&self) -> bool {
        self.low_byte() == 1
    }

    /// 操作码（哨兵或未知字节返回 None）
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.command).ok()
    }

    /// 构造指定操作码的响应帧（用于模拟设备）
    pub fn response(opcode: Opcode, data: [u8; 4]) -> Self {
        Self {
            command: opcode.as_u8(),
            data,
            reserved: FRAME_RESERVED,
        }
    }
}

/// 在字节流中查找第一个完整且校验正确的帧
///
/// 丢失帧同步时，从 'M' 标记开始逐个尝试 8 字节窗口。
///
/// # 返回
///
/// `(offset, frame)`：帧在 `buf` 中的起始偏移和解析出的帧（可能是哨兵帧）。
pub fn find_frame(buf: &[u8]) -> Option<(usize, FocuserFrame)> {
    if buf.len() < FRAME_LEN {
        return None;
    }

    (0..=buf.len() - FRAME_LEN)
        .filter(|&i| buf[i] == FRAME_MARKER)
        .find_map(|i| {
            FocuserFrame::parse(&buf[i..i + FRAME_LEN])
                .ok()
                .map(|frame| (i, frame))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_position_request() {
        let frame = FocuserFrame::request(Opcode::ReadPosition, 0);
        assert_eq!(frame.encode(), [0x4D, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x9D]);
    }

    #[test]
    fn test_read_position_response() {
        let bytes = [0x4D, 0x50, 0x00, 0x01, 0xF4, 0x00, 0x00, 0x92];
        let frame = FocuserFrame::decode(&bytes).unwrap();
        assert_eq!(frame.opcode(), Some(Opcode::ReadPosition));
        assert_eq!(frame.payload_i32(), 128_000);
    }

    #[test]
    fn test_move_absolute_negative() {
        let frame = FocuserFrame::request(Opcode::MoveAbsolute, -32);
        assert_eq!(frame.encode(), [0x4D, 0x4D, 0xFF, 0xFF, 0xFF, 0xE0, 0x00, 0x77]);
    }

    #[test]
    fn test_read_environment_request() {
        let frame = FocuserFrame::request(Opcode::ReadEnvironment, 0);
        assert_eq!(frame.encode(), [0x4D, 0x54, 0x00, 0x00, 0x00, 0x00, 0x00, 0xA1]);
    }

    #[test]
    fn test_zero_payload_opcodes_ignore_payload() {
        let frame = FocuserFrame::request(Opcode::Park, 0x1234_5678);
        assert_eq!(frame.data, [0, 0, 0, 0]);
    }

    #[test]
    fn test_low_byte_payload() {
        let frame = FocuserFrame::request(Opcode::MoveAtSpeed, 0x1234_56C8);
        assert_eq!(frame.data, [0, 0, 0, 0xC8]);
    }

    #[test]
    fn test_request_raw_unknown_opcode() {
        assert_eq!(
            FocuserFrame::request_raw(b'X', 0),
            Err(ProtocolError::UnknownOpcode { code: b'X' })
        );
        assert!(FocuserFrame::request_raw(b'P', 0).is_ok());
    }

    #[test]
    fn test_decode_short_read() {
        let bytes = [0x4D, 0x50, 0x00, 0x00];
        assert_eq!(
            FocuserFrame::decode(&bytes),
            Err(ProtocolError::Malformed {
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_decode_bad_checksum() {
        let bytes = [0x4D, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(
            FocuserFrame::decode(&bytes),
            Err(ProtocolError::BadChecksum {
                expected: 0x9D,
                actual: 0x00
            })
        );
    }

    #[test]
    fn test_decode_invalid_marker() {
        let bytes = [0x00, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x50];
        assert_eq!(
            FocuserFrame::decode(&bytes),
            Err(ProtocolError::InvalidMarker { value: 0x00 })
        );
    }

    #[test]
    fn test_decode_sentinels() {
        let unknown = FocuserFrame {
            command: b'!',
            data: [0; 4],
            reserved: 0,
        }
        .encode();
        assert_eq!(
            FocuserFrame::decode(&unknown),
            Err(ProtocolError::DeviceUnknownCommand)
        );

        let bad = FocuserFrame {
            command: b'?',
            data: [0; 4],
            reserved: 0,
        }
        .encode();
        assert_eq!(
            FocuserFrame::decode(&bad),
            Err(ProtocolError::DeviceBadChecksum)
        );
        // 结构解析仍然成功
        assert_eq!(FocuserFrame::parse(&bad).unwrap().opcode(), None);
    }

    #[test]
    fn test_flag() {
        let moving = FocuserFrame::response(Opcode::IsMoving, [0, 0, 0, 1]);
        let idle = FocuserFrame::response(Opcode::IsMoving, [0, 0, 0, 0]);
        assert!(moving.flag());
        assert!(!idle.flag());
    }

    #[test]
    fn test_find_frame_skips_garbage() {
        let frame = FocuserFrame::response(Opcode::ReadPosition, [0, 1, 0xF4, 0]).encode();
        let mut buf = vec![0x00, 0x4D, 0x13];
        buf.extend_from_slice(&frame);
        let (offset, found) = find_frame(&buf).unwrap();
        assert_eq!(offset, 3);
        assert_eq!(found.payload_i32(), 128_000);
    }

    #[test]
    fn test_find_frame_none() {
        assert!(find_frame(&[0x4D, 0x50]).is_none());
        assert!(find_frame(&[0x4D; 8]).is_none());
    }
}
