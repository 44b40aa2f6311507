//! 命令分发器
//!
//! 同步请求/响应：写一帧，读一帧，校验操作码回显。
//! 分发器独占传输句柄，`&mut self` 保证同一时刻只有一次交换。

use crate::error::DriverError;
use dreamfocuser_protocol::{FRAME_LEN, FocuserFrame, Opcode, ProtocolError, RESPONSE_TIMEOUT, find_frame};
use dreamfocuser_serial::{SerialError, SerialTransport};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 命令分发器
pub struct Dispatcher<T: SerialTransport> {
    transport: T,
    read_timeout: Duration,
}

impl<T: SerialTransport> Dispatcher<T> {
    /// 使用默认 5 秒读取截止时间
    pub fn new(transport: T) -> Self {
        Self::with_read_timeout(transport, RESPONSE_TIMEOUT)
    }

    pub fn with_read_timeout(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// 发送一条命令并返回设备响应帧
    ///
    /// # 步骤
    /// 1. 清空传输的输入/输出缓冲区
    /// 2. 编码并写入 8 字节（短写为 `IO_WRITE`）
    /// 3. 在截止时间内读取 8 字节
    /// 4. 解码（哨兵响应优先于操作码检查）
    /// 5. 校验响应操作码等于请求操作码
    pub fn exchange(&mut self, opcode: Opcode, payload: i32) -> Result<FocuserFrame, DriverError> {
        self.exchange_frame(FocuserFrame::request(opcode, payload))
    }

    /// 以原始操作码字节发送命令
    ///
    /// 不在协议表内的操作码在编码前被拒绝，不会写入任何字节。
    pub fn exchange_raw(&mut self, code: u8, payload: i32) -> Result<FocuserFrame, DriverError> {
        let request = FocuserFrame::request_raw(code, payload)?;
        self.exchange_frame(request)
    }

    fn exchange_frame(&mut self, request: FocuserFrame) -> Result<FocuserFrame, DriverError> {
        self.transport.flush_both()?;

        let bytes = request.encode();
        trace!("TX {}: {}", self.transport.name(), hex::encode(bytes));

        let written = self.transport.write(&bytes)?;
        if written != FRAME_LEN {
            return Err(SerialError::ShortWrite {
                expected: FRAME_LEN,
                actual: written,
            }
            .into());
        }

        let response = self.read_response()?;
        if response.command != request.command {
            return Err(DriverError::OpcodeMismatch {
                expected: request.command,
                actual: response.command,
            });
        }

        debug!(
            "Exchange '{}' ok, payload {:02X?}",
            char::from(request.command),
            response.data
        );
        Ok(response)
    }

    fn read_response(&mut self) -> Result<FocuserFrame, DriverError> {
        let bytes = self.transport.read(FRAME_LEN, self.read_timeout)?;
        trace!("RX {}: {}", self.transport.name(), hex::encode(&bytes));

        match FocuserFrame::decode(&bytes) {
            Err(ProtocolError::InvalidMarker { value }) => self.resync(bytes, value),
            result => Ok(result?),
        }
    }

    /// 丢失帧同步后再读一帧长度的字节，从中查找第一个合法帧
    fn resync(&mut self, mut buf: Vec<u8>, marker: u8) -> Result<FocuserFrame, DriverError> {
        warn!(
            "Response starts with 0x{:02X} instead of the frame marker, resynchronizing",
            marker
        );

        match self.transport.read(FRAME_LEN, self.read_timeout) {
            Ok(more) => buf.extend_from_slice(&more),
            Err(SerialError::Timeout) => {},
            Err(e) => return Err(e.into()),
        }
        trace!("RX {} (resync): {}", self.transport.name(), hex::encode(&buf));

        match find_frame(&buf) {
            Some((offset, _)) => {
                debug!("Resynchronized at offset {}", offset);
                Ok(FocuserFrame::decode(&buf[offset..offset + FRAME_LEN])?)
            },
            None => Err(ProtocolError::InvalidMarker { value: marker }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use dreamfocuser_serial::{MockRead, MockTransport};
    use std::io;

    fn dispatcher() -> (Dispatcher<MockTransport>, MockTransport) {
        let mock = MockTransport::new("mock");
        (Dispatcher::new(mock.clone()), mock)
    }

    fn sentinel(code: u8) -> Vec<u8> {
        FocuserFrame {
            command: code,
            data: [0; 4],
            reserved: 0,
        }
        .encode()
        .to_vec()
    }

    #[test]
    fn test_read_position_exchange() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(vec![0x4D, 0x50, 0x00, 0x01, 0xF4, 0x00, 0x00, 0x92]);

        let frame = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap();
        assert_eq!(frame.payload_i32(), 128_000);
        assert_eq!(
            mock.written(),
            vec![vec![0x4D, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x9D]]
        );
        // 每次交换前清空缓冲区
        assert_eq!(mock.flush_count(), 1);
    }

    #[test]
    fn test_bad_checksum_response() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(vec![0x4D, 0x50, 0, 0, 0, 0, 0, 0]);

        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadChecksum);
    }

    #[test]
    fn test_sentinels_take_precedence_over_opcode_check() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(sentinel(b'!'));
        mock.push_response(sentinel(b'?'));

        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceUnknownCmd);
        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceBadChecksum);
    }

    #[test]
    fn test_opcode_mismatch() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(FocuserFrame::response(Opcode::IsMoving, [0; 4]).encode());

        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert!(matches!(
            err,
            DriverError::OpcodeMismatch {
                expected: b'P',
                actual: b'I'
            }
        ));
    }

    #[test]
    fn test_unknown_opcode_writes_nothing() {
        let (mut dispatcher, mock) = dispatcher();

        let err = dispatcher.exchange_raw(b'X', 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOpcode);
        assert!(mock.written().is_empty());
        assert_eq!(mock.flush_count(), 0);
    }

    #[test]
    fn test_short_read_is_malformed() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(vec![0x4D, 0x50, 0x00]);

        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_timeout_and_read_errors() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_read(MockRead::Timeout);
        mock.push_read(MockRead::Error(io::ErrorKind::BrokenPipe));

        let err = dispatcher.exchange(Opcode::Stop, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoReadTimeout);
        let err = dispatcher.exchange(Opcode::Stop, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoRead);
    }

    #[test]
    fn test_short_write_is_io_write() {
        let (mut dispatcher, mock) = dispatcher();
        mock.limit_writes(5);

        mock.push_response(FocuserFrame::response(Opcode::Stop, [0; 4]).encode());

        let err = dispatcher.exchange(Opcode::Stop, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoWrite);
        // 短写后不读取响应
        assert_eq!(mock.pending_reads(), 1);
    }

    #[test]
    fn test_failed_write_is_io_write() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(
            FocuserFrame::response(Opcode::ReadPosition, [0, 0, 0x07, 0xD0]).encode(),
        );
        mock.fail_writes(io::ErrorKind::BrokenPipe);

        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoWrite);
        assert!(err.is_transport());
        assert!(mock.written().is_empty());
        assert_eq!(mock.pending_reads(), 1);

        // 写入恢复后，排队的响应属于下一次交换
        mock.restore_writes();
        let frame = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap();
        assert_eq!(frame.payload_i32(), 2000);
    }

    #[test]
    fn test_resync_after_leading_garbage() {
        let (mut dispatcher, mock) = dispatcher();
        let frame = FocuserFrame::response(Opcode::ReadPosition, [0, 0, 0x07, 0xD0]).encode();
        let mut stream = vec![0x00, 0x13];
        stream.extend_from_slice(&frame);
        mock.push_response(stream);

        let response = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap();
        assert_eq!(response.payload_i32(), 2000);
    }

    #[test]
    fn test_resync_failure_is_malformed() {
        let (mut dispatcher, mock) = dispatcher();
        mock.push_response(vec![0x01; 8]);

        let err = dispatcher.exchange(Opcode::ReadPosition, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
