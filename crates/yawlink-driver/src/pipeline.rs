//! 融合主循环
//!
//! 单线程协作式循环：每个 tick 依次执行 IMU 监督与视觉串口处理，然后休眠
//! `tick_interval`。总线回调不经过这里，它们只读写共享上下文。

use crate::mode::SupervisorState;
use crate::supervisor::LivenessSupervisor;
use crate::vision::{VisionLink, VisionTick};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, trace};
use yawlink_hal::{Clock, Delay, OrientationSensor, SerialLink};

/// 单次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub supervisor: SupervisorState,
    pub vision: VisionTick,
}

/// 融合引擎：监督器 + 视觉链路
pub struct FusionEngine<S, L, C, D> {
    supervisor: LivenessSupervisor<S, C, D>,
    vision: VisionLink<L>,
    clock: C,
}

impl<S, L, C, D> FusionEngine<S, L, C, D>
where
    S: OrientationSensor,
    L: SerialLink,
    C: Clock,
    D: Delay,
{
    pub fn new(supervisor: LivenessSupervisor<S, C, D>, vision: VisionLink<L>, clock: C) -> Self {
        Self {
            supervisor,
            vision,
            clock,
        }
    }

    /// 执行一个完整周期（不休眠）
    pub fn tick(&mut self) -> TickReport {
        let supervisor = self.supervisor.tick();
        let vision = self.vision.tick(self.clock.now_ms());
        TickReport { supervisor, vision }
    }

    pub fn supervisor(&self) -> &LivenessSupervisor<S, C, D> {
        &self.supervisor
    }

    pub fn vision(&self) -> &VisionLink<L> {
        &self.vision
    }
}

/// 主循环
///
/// 直到 `is_running` 被清除才返回。单个 tick 内的所有故障都已在监督器和
/// 视觉链路中消化。
pub fn fusion_loop<S, L, C, D>(
    mut engine: FusionEngine<S, L, C, D>,
    is_running: Arc<AtomicBool>,
    tick_interval: Duration,
) where
    S: OrientationSensor,
    L: SerialLink,
    C: Clock,
    D: Delay,
{
    info!("Fusion loop started (tick interval {:?})", tick_interval);
    let mut ticks: u64 = 0;
    while is_running.load(Ordering::Acquire) {
        let report = engine.tick();
        ticks += 1;
        if report.vision.lines > 0 {
            trace!("tick {}: {:?}", ticks, report);
        }
        spin_sleep::sleep(tick_interval);
    }
    info!("Fusion loop exited after {} ticks", ticks);
}
