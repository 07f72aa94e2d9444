//! Mock 串口

use crate::{DeviceError, DeviceErrorKind, HalError, SerialLink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockSerialState {
    rx: VecDeque<u8>,
    fail_next_read: bool,
}

/// 可编程的串口
pub struct MockSerial {
    state: Arc<Mutex<MockSerialState>>,
    /// 单次读取的最大字节数（模拟 UART FIFO 深度）
    chunk_limit: usize,
}

/// [`MockSerial`] 的测试控制句柄
#[derive(Clone)]
pub struct MockSerialHandle {
    state: Arc<Mutex<MockSerialState>>,
}

impl MockSerial {
    pub fn new() -> (Self, MockSerialHandle) {
        Self::with_chunk_limit(usize::MAX)
    }

    pub fn with_chunk_limit(chunk_limit: usize) -> (Self, MockSerialHandle) {
        let state = Arc::new(Mutex::new(MockSerialState::default()));
        (
            Self {
                state: state.clone(),
                chunk_limit: chunk_limit.max(1),
            },
            MockSerialHandle { state },
        )
    }
}

impl SerialLink for MockSerial {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HalError> {
        let mut state = self.state.lock();
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(DeviceError::new(DeviceErrorKind::Backend, "injected read failure").into());
        }
        let n = buf.len().min(state.rx.len()).min(self.chunk_limit);
        for slot in buf.iter_mut().take(n) {
            // n <= rx.len()
            *slot = state.rx.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl MockSerialHandle {
    /// 注入原始字节
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state.lock().rx.extend(bytes.iter().copied());
    }

    /// 注入文本
    pub fn push_str(&self, text: &str) {
        self.push_bytes(text.as_bytes());
    }

    /// 注入一行（自动追加 `'\n'`）
    pub fn push_line(&self, line: &str) {
        let mut state = self.state.lock();
        state.rx.extend(line.as_bytes().iter().copied());
        state.rx.push_back(b'\n');
    }

    /// 下一次读取返回错误
    pub fn fail_next_read(&self) {
        self.state.lock().fail_next_read = true;
    }

    /// 尚未被读取的字节数
    pub fn pending(&self) -> usize {
        self.state.lock().rx.len()
    }
}
