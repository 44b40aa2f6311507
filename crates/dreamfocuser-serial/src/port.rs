//! 基于 `serialport` 的真实串口传输

use crate::{SerialError, SerialTransport};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 真实串口
///
/// 以 8N1、无流控打开。关闭后所有操作返回 [`SerialError::Closed`]。
pub struct SerialPortTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortTransport {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 设备路径（如 "/dev/ttyACM0"）
    /// - `baud_rate`: 波特率（DreamFocuser 为 9600）
    ///
    /// # 错误
    /// - `SerialError::Open`: 设备不存在或没有读写权限
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        debug!("Opening serial port {} at {} baud (8N1)", path, baud_rate);

        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| SerialError::Open {
                path: path.to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            path: path.to_string(),
            port: Some(port),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, SerialError> {
        self.port.as_mut().ok_or(SerialError::Closed)
    }
}

impl SerialTransport for SerialPortTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SerialError> {
        let port = self.port_mut()?;
        let mut written = 0;

        while written < bytes.len() {
            match port.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SerialError::Write(e)),
            }
        }

        port.flush().map_err(SerialError::Write)?;
        trace!("Wrote {} bytes to {}", written, self.path);
        Ok(written)
    }

    fn read(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, SerialError> {
        let started = Instant::now();
        let port = self.port_mut()?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                break;
            }

            port.set_timeout(timeout - elapsed)
                .map_err(|e| SerialError::Read(e.into()))?;

            match port.read(&mut buf[filled..]) {
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SerialError::Read(e)),
            }
        }

        if filled == 0 {
            return Err(SerialError::Timeout);
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn flush_both(&mut self) -> Result<(), SerialError> {
        self.port_mut()?
            .clear(ClearBuffer::All)
            .map_err(|e| SerialError::Flush(e.into()))
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.path);
        }
    }

    fn name(&self) -> &str {
        &self.path
    }
}
