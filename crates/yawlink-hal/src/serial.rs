//! 基于 `std::io::Read` 的串口适配器
//!
//! 适用于已配置为非阻塞或带读超时的串口设备文件、socket 等。
//! `WouldBlock` / `TimedOut` / `Interrupted` 以及 `Ok(0)` 都视为"暂无数据"。

use crate::{DeviceError, DeviceErrorKind, HalError, SerialLink};
use std::io::{ErrorKind, Read};
use tracing::trace;

/// 将任意 `Read` 包装为 [`SerialLink`]
pub struct ReaderSerialLink<R: Read> {
    inner: R,
}

impl<R: Read> ReaderSerialLink<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// 取回内部 reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> SerialLink for ReaderSerialLink<R> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HalError> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                trace!("serial read yielded no data: {}", e);
                Ok(0)
            },
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::NotFound
                ) =>
            {
                Err(DeviceError::new(DeviceErrorKind::NotFound, e.to_string()).into())
            },
            Err(e) => Err(HalError::Io(e)),
        }
    }
}
