//! # DreamFocuser Serial Transport
//!
//! 串口传输抽象层：按字节读写，不理解帧格式。
//!
//! - [`SerialTransport`]: 统一的传输接口（打开之后的读/写/清空/关闭）
//! - [`SerialPortTransport`]: 基于 `serialport` 的真实串口（9600 8N1，无流控）
//! - `mock`: 脚本化的模拟传输（feature `mock`）

use std::time::Duration;
use thiserror::Error;

pub mod port;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use port::SerialPortTransport;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRead, MockTransport};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    /// 打开串口失败
    #[error("Failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入失败
    #[error("Write error: {0}")]
    Write(#[source] std::io::Error),

    /// 只写入了部分字节
    #[error("Short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// 读取失败
    #[error("Read error: {0}")]
    Read(#[source] std::io::Error),

    /// 在截止时间内没有收到任何字节
    #[error("Read timeout")]
    Timeout,

    /// 清空缓冲区失败
    #[error("Flush error: {0}")]
    Flush(#[source] std::io::Error),

    /// 传输已关闭
    #[error("Transport closed")]
    Closed,
}

/// 串口传输接口
///
/// 调用方保证同一时刻只有一次读写（单线程协作模型），实现无需内部同步。
pub trait SerialTransport {
    /// 写入全部字节，返回实际写入的字节数
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SerialError>;

    /// 在 `timeout` 内读取最多 `len` 字节
    ///
    /// # 返回
    /// - `Ok(bytes)`: 收到的字节（截止时间到达时可能少于 `len`）
    /// - `Err(SerialError::Timeout)`: 截止时间内一个字节也没收到
    fn read(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, SerialError>;

    /// 清空输入和输出缓冲区
    fn flush_both(&mut self) -> Result<(), SerialError>;

    /// 关闭传输（幂等）
    fn close(&mut self) {}

    /// 设备名称（用于日志）
    fn name(&self) -> &str;
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SerialError> {
        (**self).write(bytes)
    }

    fn read(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, SerialError> {
        (**self).read(len, timeout)
    }

    fn flush_both(&mut self) -> Result<(), SerialError> {
        (**self).flush_both()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
