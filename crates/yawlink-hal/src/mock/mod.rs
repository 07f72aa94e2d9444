//! Mock 硬件后端
//!
//! 用于测试和仿真的可编程设备。每个 mock 设备都带一个可克隆的 handle，
//! 测试线程通过 handle 注入事件、模拟断线，设备本身交给融合引擎持有。

mod imu;
mod serial;
mod time;

pub use imu::{MockImu, MockImuHandle};
pub use serial::{MockSerial, MockSerialHandle};
pub use time::{MockClock, MockResetLine};
