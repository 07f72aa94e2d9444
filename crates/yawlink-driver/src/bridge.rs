//! 桥接器句柄（对外 API）

use crate::error::DriverError;
use crate::metrics::MetricsSnapshot;
use crate::mode::SupervisorState;
use crate::pipeline::{FusionEngine, fusion_loop};
use crate::relay::RelayResponder;
use crate::state::{BridgeContext, VisionSnapshot, YawSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info};
use yawlink_hal::{Clock, Delay, OrientationSensor, SensorAddress, SerialLink};

/// 停止时等待主循环退出的上限
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 由看门狗线程 join，当前线程只带超时等待结果
        spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "Thread panicked during join"),
            )),
        }
    }
}

/// 运行中的桥接器
///
/// 持有融合主循环线程；Drop 时停止主循环并等待其退出（带超时）。
/// 主机总线回调通过 [`relay()`](Self::relay) 取得 [`RelayResponder`]。
pub struct Bridge {
    ctx: Arc<BridgeContext>,
    relay: RelayResponder,
    is_running: Arc<AtomicBool>,
    loop_thread: Option<JoinHandle<()>>,
}

impl Bridge {
    /// 启动主循环线程
    pub fn start<S, L, C, D>(
        engine: FusionEngine<S, L, C, D>,
        ctx: Arc<BridgeContext>,
        relay: RelayResponder,
        tick_interval: Duration,
    ) -> Result<Self, DriverError>
    where
        S: OrientationSensor + Send + 'static,
        L: SerialLink + Send + 'static,
        C: Clock + Send + 'static,
        D: Delay + Send + 'static,
    {
        let is_running = Arc::new(AtomicBool::new(true));
        let flag = is_running.clone();
        let loop_thread = std::thread::Builder::new()
            .name("yawlink-fusion".to_string())
            .spawn(move || fusion_loop(engine, flag, tick_interval))
            .map_err(|e| DriverError::IoThread(e.to_string()))?;

        info!("Bridge started");
        Ok(Self {
            ctx,
            relay,
            is_running,
            loop_thread: Some(loop_thread),
        })
    }

    /// 中继应答器（可克隆后交给总线回调）
    pub fn relay(&self) -> RelayResponder {
        self.relay.clone()
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    /// 航向快照（无锁）
    pub fn yaw(&self) -> Arc<YawSnapshot> {
        self.ctx.yaw_snapshot()
    }

    /// 视觉快照（无锁）
    pub fn vision(&self) -> Arc<VisionSnapshot> {
        self.ctx.vision_snapshot()
    }

    pub fn signal(&self) -> u8 {
        self.ctx.signal()
    }

    pub fn supervisor_state(&self) -> SupervisorState {
        self.ctx.supervisor_state()
    }

    pub fn sensor_address(&self) -> SensorAddress {
        self.ctx.sensor_address()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 主循环是否仍在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
            && self.loop_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 停止主循环并等待退出
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.is_running.store(false, Ordering::Release);
        let Some(handle) = self.loop_thread.take() else {
            return Ok(());
        };
        handle.join_timeout(JOIN_TIMEOUT).map_err(|_| DriverError::Timeout)?;
        info!("Bridge stopped");
        Ok(())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Fusion thread did not exit within {:?}: {}", JOIN_TIMEOUT, e);
        }
    }
}
