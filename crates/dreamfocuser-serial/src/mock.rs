//! 脚本化的模拟传输
//!
//! 按顺序返回预先排队的读取结果，并记录所有写入的字节。
//! `MockTransport` 可以 `clone()`，克隆体共享同一份内部状态，
//! 测试代码保留一份用于排队响应和检查写入。

use crate::{SerialError, SerialTransport};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// 一次读取的脚本结果
#[derive(Debug, Clone)]
pub enum MockRead {
    /// 返回这些字节（超过请求长度的部分留给下一次读取）
    Bytes(Vec<u8>),
    /// 返回读取错误
    Error(io::ErrorKind),
    /// 返回超时
    Timeout,
}

#[derive(Debug, Default)]
struct MockState {
    reads: VecDeque<MockRead>,
    written: Vec<Vec<u8>>,
    flush_count: usize,
    write_error: Option<io::ErrorKind>,
    write_limit: Option<usize>,
    closed: bool,
}

/// 模拟传输
#[derive(Debug, Clone)]
pub struct MockTransport {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 排队一次读取返回的字节
    pub fn push_response(&self, bytes: impl Into<Vec<u8>>) {
        self.state().reads.push_back(MockRead::Bytes(bytes.into()));
    }

    /// 排队一次读取结果
    pub fn push_read(&self, read: MockRead) {
        self.state().reads.push_back(read);
    }

    /// 之后的写入全部失败
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.state().write_error = Some(kind);
    }

    /// 之后的写入最多只写入 `limit` 字节
    pub fn limit_writes(&self, limit: usize) {
        self.state().write_limit = Some(limit);
    }

    /// 恢复正常写入
    pub fn restore_writes(&self) {
        let mut state = self.state();
        state.write_error = None;
        state.write_limit = None;
    }

    /// 已写入的全部数据（每次 `write` 一项）
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    /// 清空写入记录
    pub fn clear_written(&self) {
        self.state().written.clear();
    }

    /// `flush_both` 的调用次数
    pub fn flush_count(&self) -> usize {
        self.state().flush_count
    }

    /// 尚未消费的读取脚本数量
    pub fn pending_reads(&self) -> usize {
        self.state().reads.len()
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl SerialTransport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SerialError> {
        let mut state = self.state();
        if state.closed {
            return Err(SerialError::Closed);
        }
        if let Some(kind) = state.write_error {
            return Err(SerialError::Write(io::Error::new(kind, "mock write failure")));
        }

        let n = state.write_limit.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        state.written.push(bytes[..n].to_vec());
        Ok(n)
    }

    fn read(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>, SerialError> {
        let mut state = self.state();
        if state.closed {
            return Err(SerialError::Closed);
        }

        match state.reads.pop_front() {
            None | Some(MockRead::Timeout) => Err(SerialError::Timeout),
            Some(MockRead::Error(kind)) => {
                Err(SerialError::Read(io::Error::new(kind, "mock read failure")))
            },
            Some(MockRead::Bytes(mut bytes)) => {
                if bytes.len() > len {
                    let rest = bytes.split_off(len);
                    state.reads.push_front(MockRead::Bytes(rest));
                }
                if bytes.is_empty() {
                    return Err(SerialError::Timeout);
                }
                Ok(bytes)
            },
        }
    }

    fn flush_both(&mut self) -> Result<(), SerialError> {
        let mut state = self.state();
        if state.closed {
            return Err(SerialError::Closed);
        }
        state.flush_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.state().closed = true;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
