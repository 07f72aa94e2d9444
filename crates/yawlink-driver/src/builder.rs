//! Builder 模式实现
//!
//! 提供链式构造 [`Bridge`] 的便捷方式。

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::DriverError;
use crate::pipeline::FusionEngine;
use crate::relay::RelayResponder;
use crate::state::BridgeContext;
use crate::supervisor::{LivenessSupervisor, SupervisorEvent};
use crate::vision::{FrameParser, VisionLink};
use crossbeam_channel::Sender;
use std::sync::Arc;
use yawlink_hal::{Clock, Delay, OrientationSensor, ResetLine, SerialLink};

/// Bridge Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use yawlink_driver::{BridgeBuilder, BridgeConfig};
/// use yawlink_hal::mock::{MockImu, MockSerial};
///
/// let (imu, _imu_ctl) = MockImu::new();
/// let (serial, _serial_ctl) = MockSerial::new();
/// let bridge = BridgeBuilder::new()
///     .config(BridgeConfig::default())
///     .build_std(imu, serial)
///     .unwrap();
/// let relay = bridge.relay();
/// let bytes = relay.on_request();
/// ```
pub struct BridgeBuilder {
    config: BridgeConfig,
    reset_line: Option<Box<dyn ResetLine + Send>>,
    events: Option<Sender<SupervisorEvent>>,
    context: Option<Arc<BridgeContext>>,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            reset_line: None,
            events: None,
            context: None,
        }
    }

    /// 设置配置（构建时校验）
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// 接入 IMU 硬件复位线（可选）
    pub fn reset_line(mut self, line: Box<dyn ResetLine + Send>) -> Self {
        self.reset_line = Some(line);
        self
    }

    /// 接入监督器事件通道（可选）
    pub fn event_sink(mut self, sender: Sender<SupervisorEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// 使用外部创建的共享上下文（可选）
    pub fn context(mut self, ctx: Arc<BridgeContext>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// 只组装引擎，不启动线程（由调用方驱动 `tick()`）
    pub fn build_engine<S, L, C, D>(
        self,
        sensor: S,
        serial: L,
        clock: C,
        delay: D,
    ) -> Result<(FusionEngine<S, L, C, D>, Arc<BridgeContext>, RelayResponder), DriverError>
    where
        S: OrientationSensor,
        L: SerialLink,
        C: Clock + Clone,
        D: Delay,
    {
        self.config.validate()?;

        let ctx = self.context.unwrap_or_default();
        let mut supervisor = LivenessSupervisor::new(
            sensor,
            clock.clone(),
            delay,
            self.config.imu.clone(),
            ctx.clone(),
        );
        if let Some(line) = self.reset_line {
            supervisor = supervisor.with_reset_line(line);
        }
        if let Some(sender) = self.events {
            supervisor = supervisor.with_event_sink(sender);
        }

        let vision = VisionLink::new(
            serial,
            FrameParser::new(ctx.clone()),
            self.config.vision.clone(),
            clock.now_ms(),
        );
        let relay = RelayResponder::new(ctx.clone(), self.config.relay.extension)
            .with_address(self.config.relay.slave_address);
        Ok((FusionEngine::new(supervisor, vision, clock), ctx, relay))
    }

    /// 组装并启动主循环线程
    pub fn build<S, L, C, D>(self, sensor: S, serial: L, clock: C, delay: D) -> Result<Bridge, DriverError>
    where
        S: OrientationSensor + Send + 'static,
        L: SerialLink + Send + 'static,
        C: Clock + Clone + Send + 'static,
        D: Delay + Send + 'static,
    {
        let tick_interval = self.config.pipeline.tick_interval();
        let (engine, ctx, relay) = self.build_engine(sensor, serial, clock, delay)?;
        Bridge::start(engine, ctx, relay, tick_interval)
    }

    /// 使用 std 单调时钟与 `spin_sleep` 延时启动
    #[cfg(feature = "std-backend")]
    pub fn build_std<S, L>(self, sensor: S, serial: L) -> Result<Bridge, DriverError>
    where
        S: OrientationSensor + Send + 'static,
        L: SerialLink + Send + 'static,
    {
        use yawlink_hal::{MonotonicClock, SpinDelay};
        self.build(sensor, serial, MonotonicClock::new(), SpinDelay)
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
