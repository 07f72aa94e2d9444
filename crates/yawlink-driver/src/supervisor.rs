//! IMU 存活监督
//!
//! 负责 IMU 的初始化、数据读取、静默检测和自动恢复：
//!
//! - **Bring-up**：复位脉冲（或稳定等待）→ `begin(address)` → 启用游戏旋转向量报告 → 清空航向状态
//! - **Active**：每个 tick 探测存活并读取事件；设备自报告复位时重新配置报告
//! - **Recovering**：按 `retry_interval` 限速重试，当前地址失败时切换到备用地址
//!
//! 所有故障都在这里消化，主循环永不因传感器问题退出。

use crate::config::ImuConfig;
use crate::heading::AngleUnwrapper;
use crate::heartbeat::SilenceWatchdog;
use crate::metrics::BridgeMetrics;
use crate::mode::SupervisorState;
use crate::state::{BridgeContext, YawSnapshot};
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use yawlink_hal::{Clock, Delay, OrientationSensor, ResetLine, SensorAddress, SensorEvent};

/// 当前传感器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorHandle {
    /// 当前使用的地址
    pub address: SensorAddress,
    /// 最近一次 bring-up 是否成功且尚未判定丢失
    pub connected: bool,
    /// 最近一次有效采样的时间（单调毫秒）
    pub last_good_sample_ms: Option<u64>,
}

impl SensorHandle {
    pub fn new(address: SensorAddress) -> Self {
        Self {
            address,
            connected: false,
            last_good_sample_ms: None,
        }
    }
}

/// 信号丢失原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalLostReason {
    /// 存活探测失败
    Disconnected,
    /// 超过静默超时没有有效采样
    Silence { elapsed_ms: u64 },
}

impl fmt::Display for SignalLostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "device not responding"),
            Self::Silence { elapsed_ms } => write!(f, "no samples for {} ms", elapsed_ms),
        }
    }
}

/// 监督器事件（诊断用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// 初始化或恢复成功
    Activated { address: SensorAddress },
    /// 进入恢复状态
    SignalLost { reason: SignalLostReason },
    /// 设备自报告内部复位
    DeviceReset,
    /// 一次恢复尝试失败（`attempt` 从 1 开始，成功后清零）
    RecoveryFailed { attempt: u32 },
}

/// IMU 存活监督器
pub struct LivenessSupervisor<S, C, D> {
    sensor: S,
    clock: C,
    delay: D,
    reset_line: Option<Box<dyn ResetLine + Send>>,
    config: ImuConfig,
    ctx: Arc<BridgeContext>,
    events: Option<Sender<SupervisorEvent>>,
    unwrapper: AngleUnwrapper,
    handle: SensorHandle,
    state: SupervisorState,
    watchdog: SilenceWatchdog,
    last_attempt_ms: Option<u64>,
    failed_attempts: u32,
}

impl<S, C, D> LivenessSupervisor<S, C, D>
where
    S: OrientationSensor,
    C: Clock,
    D: Delay,
{
    pub fn new(sensor: S, clock: C, delay: D, config: ImuConfig, ctx: Arc<BridgeContext>) -> Self {
        let now = clock.now_ms();
        let address = config.primary();
        ctx.set_sensor_address(address);
        Self {
            watchdog: SilenceWatchdog::new(Duration::from_millis(config.silence_timeout_ms), now),
            sensor,
            clock,
            delay,
            reset_line: None,
            config,
            ctx,
            events: None,
            unwrapper: AngleUnwrapper::new(),
            handle: SensorHandle::new(address),
            state: SupervisorState::Uninitialized,
            last_attempt_ms: None,
            failed_attempts: 0,
        }
    }

    /// 接入硬件复位线
    pub fn with_reset_line(mut self, line: Box<dyn ResetLine + Send>) -> Self {
        self.reset_line = Some(line);
        self
    }

    /// 接入事件通道（`try_send`，满了直接丢弃）
    pub fn with_event_sink(mut self, sender: Sender<SupervisorEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn handle(&self) -> &SensorHandle {
        &self.handle
    }

    pub fn unwrapper(&self) -> &AngleUnwrapper {
        &self.unwrapper
    }

    /// 执行一个监督周期
    pub fn tick(&mut self) -> SupervisorState {
        match self.state {
            SupervisorState::Uninitialized => self.initial_bring_up(),
            SupervisorState::Active => self.service_active(),
            SupervisorState::Recovering => {
                if self.retry_due(self.clock.now_ms()) {
                    self.attempt_recovery();
                }
            },
        }
        self.state
    }

    fn initial_bring_up(&mut self) {
        info!("Initializing IMU at {}", self.handle.address);
        let ok = self.bring_up_with_fallback();
        self.last_attempt_ms = Some(self.clock.now_ms());
        if ok {
            self.activate();
        } else {
            self.failed_attempts = 1;
            BridgeMetrics::bump(&self.ctx.metrics.recovery_failures);
            warn!(
                "IMU not found at {} or {}, will keep retrying",
                self.handle.address,
                self.handle.address.alternate()
            );
            self.set_state(SupervisorState::Recovering);
            self.emit(SupervisorEvent::RecoveryFailed { attempt: 1 });
        }
    }

    fn service_active(&mut self) {
        if !self.sensor.is_connected() {
            self.signal_lost(SignalLostReason::Disconnected);
            return;
        }

        let mut got_sample = false;
        for _ in 0..self.config.max_events_per_tick {
            match self.sensor.poll_event() {
                Ok(Some(event)) => got_sample |= self.handle_event(event),
                Ok(None) => break,
                Err(e) => {
                    BridgeMetrics::bump(&self.ctx.metrics.poll_errors);
                    debug!("IMU poll error: {}", e);
                    break;
                },
            }
        }

        let now = self.clock.now_ms();
        if got_sample {
            self.watchdog.rearm(now);
            self.handle.last_good_sample_ms = Some(now);
        } else if self.watchdog.is_silent(now) {
            let elapsed_ms = self.watchdog.elapsed_ms(now);
            self.signal_lost(SignalLostReason::Silence { elapsed_ms });
        }
    }

    /// 处理一个 IMU 事件，返回是否得到有效采样
    fn handle_event(&mut self, event: SensorEvent) -> bool {
        if event.device_reset {
            warn!("IMU reported an internal reset, reconfiguring reports");
            BridgeMetrics::bump(&self.ctx.metrics.device_resets);
            self.configure_reports();
            self.unwrapper.reset();
            self.publish_yaw();
            self.emit(SupervisorEvent::DeviceReset);
        }

        let Some(sample) = event.rotation_sample() else {
            trace!("Ignoring IMU report {:?}", event.report);
            return false;
        };

        if self.ctx.take_rezero_request() {
            self.unwrapper.rezero();
            BridgeMetrics::bump(&self.ctx.metrics.rezero_applied);
            info!("Yaw re-zeroed on host request");
        }

        if self.unwrapper.update(sample) {
            BridgeMetrics::bump(&self.ctx.metrics.samples_total);
            self.publish_yaw();
            true
        } else {
            BridgeMetrics::bump(&self.ctx.metrics.samples_rejected);
            debug!("Rejected non-finite orientation sample");
            false
        }
    }

    /// ACTIVE → RECOVERING，每个丢失周期只发生一次
    fn signal_lost(&mut self, reason: SignalLostReason) {
        if self.state != SupervisorState::Active {
            return;
        }
        warn!("IMU signal lost at {}: {}", self.handle.address, reason);
        BridgeMetrics::bump(&self.ctx.metrics.signal_lost_episodes);
        self.handle.connected = false;
        self.failed_attempts = 0;
        self.set_state(SupervisorState::Recovering);
        self.emit(SupervisorEvent::SignalLost { reason });

        // 距上一次 bring-up 已满 retry_interval 时立即尝试，否则等下一个到期的 tick；
        // 否则探测失败但 begin() 成功的设备会每个 tick 都被重新初始化
        if self.retry_due(self.clock.now_ms()) {
            self.attempt_recovery();
        }
    }

    fn retry_due(&self, now: u64) -> bool {
        self.last_attempt_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.config.retry_interval_ms)
    }

    /// 重试间隔从上一次尝试结束（含复位等待）开始计算
    fn attempt_recovery(&mut self) {
        BridgeMetrics::bump(&self.ctx.metrics.recovery_attempts);
        debug!("IMU recovery attempt at {}", self.handle.address);

        let ok = self.bring_up_with_fallback();
        self.last_attempt_ms = Some(self.clock.now_ms());
        if ok {
            self.activate();
        } else {
            self.failed_attempts += 1;
            BridgeMetrics::bump(&self.ctx.metrics.recovery_failures);
            warn!("IMU recovery attempt {} failed", self.failed_attempts);
            self.emit(SupervisorEvent::RecoveryFailed {
                attempt: self.failed_attempts,
            });
        }
    }

    fn activate(&mut self) {
        info!("IMU active at {}", self.handle.address);
        self.failed_attempts = 0;
        self.set_state(SupervisorState::Active);
        self.emit(SupervisorEvent::Activated {
            address: self.handle.address,
        });
    }

    /// 当前地址失败时切换到备用地址再试一次
    fn bring_up_with_fallback(&mut self) -> bool {
        if self.bring_up(self.handle.address) {
            return true;
        }

        let alternate = self.handle.address.alternate();
        debug!(
            "IMU did not answer at {}, trying {}",
            self.handle.address, alternate
        );
        self.handle.address = alternate;
        self.ctx.set_sensor_address(alternate);
        BridgeMetrics::bump(&self.ctx.metrics.address_flips);
        self.bring_up(alternate)
    }

    fn bring_up(&mut self, address: SensorAddress) -> bool {
        self.pulse_reset();

        if let Err(e) = self.sensor.begin(address) {
            debug!("IMU begin at {} failed: {}", address, e);
            self.handle.connected = false;
            return false;
        }

        // 报告启用失败不视为 bring-up 失败：静默检测会在之后接管
        self.configure_reports();
        self.unwrapper.reset();
        self.publish_yaw();

        let now = self.clock.now_ms();
        self.watchdog.rearm(now);
        self.handle.connected = true;
        true
    }

    /// 复位脉冲；无复位线时仅做稳定等待
    fn pulse_reset(&mut self) {
        if let Some(line) = self.reset_line.as_mut() {
            let pulsed = line.set_low().and_then(|_| {
                self.delay.delay_ms(self.config.reset_pulse_ms);
                line.set_high()
            });
            if let Err(e) = pulsed {
                warn!("IMU reset line error: {}", e);
            }
        }
        self.delay.delay_ms(self.config.boot_wait_ms);
    }

    fn configure_reports(&mut self) {
        if let Err(e) = self
            .sensor
            .enable_rotation_report(self.config.report_interval())
        {
            warn!("Failed to enable rotation report: {}", e);
        }
    }

    fn publish_yaw(&self) {
        let state = self.unwrapper.state();
        self.ctx.publish_yaw(YawSnapshot {
            accumulated_yaw_deg: state.accumulated_yaw_deg,
            reference_is_set: state.reference_is_set,
            sample_count: self.unwrapper.samples_since_reference(),
            updated_at_ms: self.clock.now_ms(),
        });
    }

    fn set_state(&mut self, state: SupervisorState) {
        self.state = state;
        self.ctx.supervisor_state.set(state, Ordering::Release);
    }

    fn emit(&self, event: SupervisorEvent) {
        if let Some(sender) = &self.events {
            // 诊断通道满或已断开时丢弃
            let _ = sender.try_send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use yawlink_hal::HalError;
    use yawlink_hal::mock::{MockClock, MockImu, MockImuHandle, MockResetLine};

    type TestSupervisor = LivenessSupervisor<MockImu, MockClock, MockClock>;

    fn setup(addresses: &[SensorAddress]) -> (TestSupervisor, MockImuHandle, MockClock, Arc<BridgeContext>) {
        let (imu, handle) = MockImu::with_addresses(addresses);
        let clock = MockClock::new();
        let ctx = Arc::new(BridgeContext::new());
        let supervisor = LivenessSupervisor::new(
            imu,
            clock.clone(),
            clock.clone(),
            ImuConfig::default(),
            ctx.clone(),
        );
        (supervisor, handle, clock, ctx)
    }

    #[test]
    fn test_initial_bring_up_at_primary() {
        let (mut supervisor, handle, clock, ctx) = setup(&[SensorAddress::Primary]);

        assert_eq!(supervisor.tick(), SupervisorState::Active);
        assert_eq!(handle.begin_calls(), vec![SensorAddress::Primary]);
        assert_eq!(handle.last_report_interval(), Some(Duration::from_millis(20)));
        assert!(supervisor.handle().connected);
        assert_eq!(ctx.supervisor_state(), SupervisorState::Active);
        // 无复位线：仅 300 ms 稳定等待
        assert_eq!(clock.now_ms(), 300);
    }

    #[test]
    fn test_initial_bring_up_falls_back_to_alternate() {
        let (mut supervisor, handle, _clock, ctx) = setup(&[SensorAddress::Secondary]);

        assert_eq!(supervisor.tick(), SupervisorState::Active);
        assert_eq!(
            handle.begin_calls(),
            vec![SensorAddress::Primary, SensorAddress::Secondary]
        );
        assert_eq!(supervisor.handle().address, SensorAddress::Secondary);
        assert_eq!(ctx.sensor_address(), SensorAddress::Secondary);
        assert_eq!(ctx.metrics.snapshot().address_flips, 1);
    }

    #[test]
    fn test_initial_bring_up_failure_enters_recovering() {
        let (mut supervisor, _handle, _clock, ctx) = setup(&[]);

        assert_eq!(supervisor.tick(), SupervisorState::Recovering);
        let metrics = ctx.metrics.snapshot();
        assert_eq!(metrics.recovery_failures, 1);
        // 初始化失败不算信号丢失
        assert_eq!(metrics.signal_lost_episodes, 0);
    }

    #[test]
    fn test_reset_line_pulsed_before_begin() {
        let (imu, _handle) = MockImu::new();
        let clock = MockClock::new();
        let line = MockResetLine::new();
        let ctx = Arc::new(BridgeContext::new());
        let mut supervisor =
            LivenessSupervisor::new(imu, clock.clone(), clock.clone(), ImuConfig::default(), ctx)
                .with_reset_line(Box::new(line.clone()));

        supervisor.tick();
        assert_eq!(line.history(), vec![false, true]);
        assert_eq!(line.pulse_count(), 1);
        // 5 ms 低电平 + 300 ms 启动等待
        assert_eq!(clock.now_ms(), 305);
    }

    #[test]
    fn test_samples_feed_unwrapper() {
        let (mut supervisor, handle, _clock, ctx) = setup(&[SensorAddress::Primary]);
        supervisor.tick();

        handle.push_yaw(170.0);
        handle.push_yaw(-170.0);
        supervisor.tick();

        let snapshot = ctx.yaw_snapshot();
        assert!(snapshot.reference_is_set);
        assert_eq!(snapshot.sample_count, 2);
        assert!((snapshot.accumulated_yaw_deg - 20.0).abs() < 1e-3);
        assert_eq!(ctx.metrics.snapshot().samples_total, 2);
    }

    #[test]
    fn test_max_events_per_tick_bounds_drain() {
        let (imu, handle) = MockImu::new();
        let clock = MockClock::new();
        let ctx = Arc::new(BridgeContext::new());
        let config = ImuConfig {
            max_events_per_tick: 2,
            ..ImuConfig::default()
        };
        let mut supervisor = LivenessSupervisor::new(imu, clock.clone(), clock, config, ctx);
        supervisor.tick();

        for yaw in [1.0, 2.0, 3.0, 4.0, 5.0] {
            handle.push_yaw(yaw);
        }
        supervisor.tick();
        assert_eq!(handle.pending_events(), 3);
    }

    #[test]
    fn test_silence_enters_recovering_once() {
        let (mut supervisor, handle, clock, ctx) = setup(&[SensorAddress::Primary]);
        let (tx, rx) = crossbeam_channel::bounded(16);
        supervisor.events = Some(tx);
        supervisor.tick();

        // 设备在线但不再应答 begin，也不出数
        handle.set_responsive(&[]);
        clock.advance(1001);
        assert_eq!(supervisor.tick(), SupervisorState::Recovering);

        for _ in 0..10 {
            clock.advance(100);
            assert_eq!(supervisor.tick(), SupervisorState::Recovering);
        }

        let metrics = ctx.metrics.snapshot();
        assert_eq!(metrics.signal_lost_episodes, 1);

        let lost: Vec<_> = rx
            .try_iter()
            .filter(|e| matches!(e, SupervisorEvent::SignalLost { .. }))
            .collect();
        assert_eq!(lost.len(), 1);
        assert!(matches!(
            lost[0],
            SupervisorEvent::SignalLost {
                reason: SignalLostReason::Silence { .. }
            }
        ));
    }

    #[test]
    fn test_recovery_attempts_are_rate_limited() {
        let (mut supervisor, handle, clock, ctx) = setup(&[SensorAddress::Primary]);
        supervisor.tick();
        assert_eq!(clock.now_ms(), 300);

        handle.set_present(false);
        supervisor.tick();
        assert_eq!(supervisor.state(), SupervisorState::Recovering);
        // 距上次 bring-up 不足 retry_interval，不立即尝试
        assert_eq!(ctx.metrics.snapshot().recovery_attempts, 0);

        clock.set(1300);
        supervisor.tick();
        assert_eq!(ctx.metrics.snapshot().recovery_attempts, 1);
        // 当前地址 + 备用地址，各 300 ms 等待
        let attempt_time = clock.now_ms();
        assert_eq!(attempt_time, 1900);

        // 间隔内不再尝试
        clock.set(attempt_time + 500);
        supervisor.tick();
        assert_eq!(ctx.metrics.snapshot().recovery_attempts, 1);

        clock.set(attempt_time + 1000);
        supervisor.tick();
        assert_eq!(ctx.metrics.snapshot().recovery_attempts, 2);

        handle.set_present(true);
        handle.set_responsive(&SensorAddress::ALL);
        clock.advance(1000);
        assert_eq!(supervisor.tick(), SupervisorState::Active);
        assert_eq!(ctx.metrics.snapshot().recovery_failures, 2);
    }

    #[test]
    fn test_silence_recovery_starts_immediately() {
        let (mut supervisor, handle, clock, ctx) = setup(&[SensorAddress::Primary]);
        supervisor.tick();

        // 静默超时本身已超过 retry_interval
        clock.advance(1001);
        assert_eq!(supervisor.tick(), SupervisorState::Active);
        assert_eq!(ctx.metrics.snapshot().recovery_attempts, 1);
        assert_eq!(ctx.metrics.snapshot().signal_lost_episodes, 1);
        assert_eq!(handle.begin_calls().len(), 2);
    }

    /// 存活探测始终失败、但 begin() 总能成功的传感器
    struct FlappingImu {
        begins: Arc<AtomicUsize>,
    }

    impl OrientationSensor for FlappingImu {
        fn begin(&mut self, _address: SensorAddress) -> Result<(), HalError> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn enable_rotation_report(&mut self, _interval: Duration) -> Result<(), HalError> {
            Ok(())
        }

        fn is_connected(&mut self) -> bool {
            false
        }

        fn poll_event(&mut self) -> Result<Option<SensorEvent>, HalError> {
            Ok(None)
        }
    }

    #[test]
    fn test_flapping_sensor_does_not_busy_loop_bring_up() {
        let begins = Arc::new(AtomicUsize::new(0));
        let imu = FlappingImu {
            begins: begins.clone(),
        };
        let clock = MockClock::new();
        let ctx = Arc::new(BridgeContext::new());
        let mut supervisor = LivenessSupervisor::new(
            imu,
            clock.clone(),
            clock.clone(),
            ImuConfig::default(),
            ctx.clone(),
        );
        assert_eq!(supervisor.tick(), SupervisorState::Active);

        // 前 100 个 1 ms tick：一次丢失，不重新初始化
        for _ in 0..100 {
            clock.advance(1);
            supervisor.tick();
        }
        assert_eq!(begins.load(Ordering::SeqCst), 1);
        let metrics = ctx.metrics.snapshot();
        assert_eq!(metrics.signal_lost_episodes, 1);
        assert_eq!(metrics.recovery_attempts, 0);

        while clock.now_ms() < 10_300 {
            clock.advance(1);
            supervisor.tick();
        }
        let metrics = ctx.metrics.snapshot();
        let elapsed_s = clock.now_ms() / 1000;
        // 每次尝试间隔至少 retry_interval
        assert!(metrics.recovery_attempts >= 5);
        assert!(metrics.recovery_attempts <= elapsed_s);
        assert_eq!(begins.load(Ordering::SeqCst) as u64, metrics.recovery_attempts + 1);
        assert!(metrics.signal_lost_episodes <= metrics.recovery_attempts + 1);
    }

    #[test]
    fn test_device_reset_reconfigures_without_bring_up() {
        let (mut supervisor, handle, _clock, ctx) = setup(&[SensorAddress::Primary]);
        supervisor.tick();

        handle.push_yaw(10.0);
        handle.push_yaw(50.0);
        supervisor.tick();
        assert!((ctx.yaw_snapshot().accumulated_yaw_deg - 40.0).abs() < 1e-3);

        handle.push_device_reset(-90.0);
        supervisor.tick();

        assert_eq!(handle.begin_calls().len(), 1);
        assert_eq!(handle.report_enable_count(), 2);
        assert_eq!(supervisor.state(), SupervisorState::Active);
        // 复位后的首个采样成为新零点
        let snapshot = ctx.yaw_snapshot();
        assert!(snapshot.reference_is_set);
        assert_eq!(snapshot.sample_count, 1);
        assert!(snapshot.accumulated_yaw_deg.abs() < 1e-9);
        assert_eq!(ctx.metrics.snapshot().device_resets, 1);
    }

    #[test]
    fn test_pending_rezero_applied_before_next_sample() {
        let (mut supervisor, handle, _clock, ctx) = setup(&[SensorAddress::Primary]);
        supervisor.tick();

        handle.push_yaw(0.0);
        handle.push_yaw(90.0);
        supervisor.tick();
        assert!((ctx.yaw_snapshot().accumulated_yaw_deg - 90.0).abs() < 1e-3);

        ctx.request_rezero();
        handle.push_yaw(95.0);
        handle.push_yaw(100.0);
        supervisor.tick();

        assert!(!ctx.rezero_pending());
        assert!((ctx.yaw_snapshot().accumulated_yaw_deg - 5.0).abs() < 1e-3);
        assert_eq!(ctx.metrics.snapshot().rezero_applied, 1);
    }

    #[test]
    fn test_poll_error_is_contained() {
        let (mut supervisor, handle, _clock, ctx) = setup(&[SensorAddress::Primary]);
        supervisor.tick();

        handle.push_yaw(1.0);
        handle.fail_next_poll();
        assert_eq!(supervisor.tick(), SupervisorState::Active);
        assert_eq!(ctx.metrics.snapshot().poll_errors, 1);

        supervisor.tick();
        assert_eq!(ctx.metrics.snapshot().samples_total, 1);
    }
}
