//! Mock IMU

use crate::{
    DeviceError, DeviceErrorKind, HalError, OrientationSample, OrientationSensor, SensorAddress,
    SensorEvent,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct MockImuState {
    /// 设备是否在总线上（false 模拟断线/掉电）
    present: bool,
    /// 会应答的地址
    responsive: Vec<SensorAddress>,
    /// 当前已初始化的地址
    started_at: Option<SensorAddress>,
    /// 待读事件
    events: VecDeque<SensorEvent>,
    /// `begin()` 调用记录
    begin_calls: Vec<SensorAddress>,
    /// `enable_rotation_report()` 调用记录
    report_enables: Vec<Duration>,
    /// 下一次 `poll_event()` 返回错误
    fail_next_poll: bool,
}

/// 可编程的 IMU
pub struct MockImu {
    state: Arc<Mutex<MockImuState>>,
}

/// [`MockImu`] 的测试控制句柄
#[derive(Clone)]
pub struct MockImuHandle {
    state: Arc<Mutex<MockImuState>>,
}

impl MockImu {
    /// 创建只在主地址应答的 IMU
    pub fn new() -> (Self, MockImuHandle) {
        Self::with_addresses(&[SensorAddress::Primary])
    }

    /// 创建在指定地址应答的 IMU
    pub fn with_addresses(addresses: &[SensorAddress]) -> (Self, MockImuHandle) {
        let state = Arc::new(Mutex::new(MockImuState {
            present: true,
            responsive: addresses.to_vec(),
            started_at: None,
            events: VecDeque::new(),
            begin_calls: Vec::new(),
            report_enables: Vec::new(),
            fail_next_poll: false,
        }));
        (
            Self {
                state: state.clone(),
            },
            MockImuHandle { state },
        )
    }
}

impl OrientationSensor for MockImu {
    fn begin(&mut self, address: SensorAddress) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.begin_calls.push(address);
        if !state.present {
            state.started_at = None;
            return Err(gone());
        }
        if state.responsive.contains(&address) {
            state.started_at = Some(address);
            Ok(())
        } else {
            state.started_at = None;
            Err(HalError::NoAcknowledge(address))
        }
    }

    fn enable_rotation_report(&mut self, interval: Duration) -> Result<(), HalError> {
        let mut state = self.state.lock();
        if state.started_at.is_none() || !state.present {
            return Err(HalError::NotStarted);
        }
        state.report_enables.push(interval);
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        let state = self.state.lock();
        state.present && state.started_at.is_some()
    }

    fn poll_event(&mut self) -> Result<Option<SensorEvent>, HalError> {
        let mut state = self.state.lock();
        if state.started_at.is_none() {
            return Err(HalError::NotStarted);
        }
        if !state.present {
            return Err(gone());
        }
        if state.fail_next_poll {
            state.fail_next_poll = false;
            return Err(HalError::Timeout);
        }
        Ok(state.events.pop_front())
    }
}

fn gone() -> HalError {
    DeviceError::new(DeviceErrorKind::NotFound, "IMU not on bus").into()
}

impl MockImuHandle {
    /// 注入一个游戏旋转向量采样
    pub fn push_sample(&self, sample: OrientationSample) {
        self.state.lock().events.push_back(SensorEvent::rotation(sample));
    }

    /// 注入一个纯航向采样（度）
    pub fn push_yaw(&self, yaw_deg: f32) {
        self.push_sample(OrientationSample::from_yaw_deg(yaw_deg));
    }

    /// 注入任意事件
    pub fn push_event(&self, event: SensorEvent) {
        self.state.lock().events.push_back(event);
    }

    /// 模拟设备内部复位：复位标志随下一个事件上报
    pub fn push_device_reset(&self, then_yaw_deg: f32) {
        let mut event = SensorEvent::rotation(OrientationSample::from_yaw_deg(then_yaw_deg));
        event.device_reset = true;
        self.state.lock().events.push_back(event);
    }

    /// 设备上/下线
    pub fn set_present(&self, present: bool) {
        let mut state = self.state.lock();
        state.present = present;
        if !present {
            state.events.clear();
        }
    }

    /// 修改会应答的地址集合
    pub fn set_responsive(&self, addresses: &[SensorAddress]) {
        self.state.lock().responsive = addresses.to_vec();
    }

    /// 下一次读取返回总线错误
    pub fn fail_next_poll(&self) {
        self.state.lock().fail_next_poll = true;
    }

    /// 当前初始化的地址
    pub fn started_at(&self) -> Option<SensorAddress> {
        self.state.lock().started_at
    }

    /// `begin()` 调用历史
    pub fn begin_calls(&self) -> Vec<SensorAddress> {
        self.state.lock().begin_calls.clone()
    }

    /// `enable_rotation_report()` 调用次数
    pub fn report_enable_count(&self) -> usize {
        self.state.lock().report_enables.len()
    }

    /// 最近一次启用报告的周期
    pub fn last_report_interval(&self) -> Option<Duration> {
        self.state.lock().report_enables.last().copied()
    }

    /// 待读事件数
    pub fn pending_events(&self) -> usize {
        self.state.lock().events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_only_at_responsive_address() {
        let (mut imu, handle) = MockImu::with_addresses(&[SensorAddress::Secondary]);
        assert!(matches!(
            imu.begin(SensorAddress::Primary),
            Err(HalError::NoAcknowledge(SensorAddress::Primary))
        ));
        assert!(!imu.is_connected());
        assert!(imu.begin(SensorAddress::Secondary).is_ok());
        assert!(imu.is_connected());
        assert_eq!(
            handle.begin_calls(),
            vec![SensorAddress::Primary, SensorAddress::Secondary]
        );
    }

    #[test]
    fn test_events_in_order() {
        let (mut imu, handle) = MockImu::new();
        imu.begin(SensorAddress::Primary).unwrap();
        handle.push_yaw(10.0);
        handle.push_yaw(20.0);

        let first = imu.poll_event().unwrap().unwrap();
        assert!((first.sample.unwrap().yaw_deg() - 10.0).abs() < 1e-3);
        let second = imu.poll_event().unwrap().unwrap();
        assert!((second.sample.unwrap().yaw_deg() - 20.0).abs() < 1e-3);
        assert!(imu.poll_event().unwrap().is_none());
    }

    #[test]
    fn test_unplug_drops_connection() {
        let (mut imu, handle) = MockImu::new();
        imu.begin(SensorAddress::Primary).unwrap();
        handle.push_yaw(1.0);
        handle.set_present(false);

        assert!(!imu.is_connected());
        assert!(imu.poll_event().unwrap_err().is_device_gone());
        assert!(imu.begin(SensorAddress::Primary).unwrap_err().is_device_gone());
        assert_eq!(handle.pending_events(), 0);

        handle.set_present(true);
        assert!(imu.begin(SensorAddress::Primary).is_ok());
        assert!(imu.is_connected());
    }

    #[test]
    fn test_report_enable_requires_begin() {
        let (mut imu, handle) = MockImu::new();
        assert!(matches!(
            imu.enable_rotation_report(Duration::from_millis(20)),
            Err(HalError::NotStarted)
        ));
        imu.begin(SensorAddress::Primary).unwrap();
        imu.enable_rotation_report(Duration::from_millis(20)).unwrap();
        assert_eq!(handle.report_enable_count(), 1);
        assert_eq!(
            handle.last_report_interval(),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn test_fail_next_poll_is_one_shot() {
        let (mut imu, handle) = MockImu::new();
        imu.begin(SensorAddress::Primary).unwrap();
        handle.fail_next_poll();
        assert!(imu.poll_event().is_err());
        assert!(imu.poll_event().unwrap().is_none());
    }
}
