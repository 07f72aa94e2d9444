//! 主机中继应答
//!
//! 总线从机回调运行在中断或其他线程上下文中，这里的两个入口都不阻塞、不加锁：
//! 只读写 [`BridgeContext`] 中的快照指针与原子字段。

use crate::metrics::BridgeMetrics;
use crate::state::BridgeContext;
use std::sync::Arc;
use tracing::debug;
use yawlink_protocol::{
    HostCommand, RELAY_PAYLOAD_LEN, RELAY_SLAVE_ADDRESS, RelayExtension, RelayPayload, SIGNAL_NONE,
};

/// 中继应答器（可克隆，交给总线回调持有）
#[derive(Debug, Clone)]
pub struct RelayResponder {
    ctx: Arc<BridgeContext>,
    extension: RelayExtension,
    address: u8,
}

impl RelayResponder {
    pub fn new(ctx: Arc<BridgeContext>, extension: RelayExtension) -> Self {
        Self {
            ctx,
            extension,
            address: RELAY_SLAVE_ADDRESS,
        }
    }

    /// 设置从机地址（默认 [`RELAY_SLAVE_ADDRESS`]）
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// 总线后端注册回调时使用的 7 位从机地址
    pub fn address(&self) -> u8 {
        self.address
    }

    /// 主机写入
    ///
    /// 每个字节都作为一条命令处理；空写入什么也不做。
    pub fn on_receive(&self, bytes: &[u8]) {
        for &byte in bytes {
            BridgeMetrics::bump(&self.ctx.metrics.relay_commands);
            self.ctx.record_command(byte);
            match HostCommand::from(byte) {
                HostCommand::ReZeroYaw => {
                    self.ctx.request_rezero();
                    debug!("Host requested yaw re-zero");
                },
                HostCommand::Reserved(_) => {},
            }
        }
    }

    /// 主机读取：返回当前载荷的线上字节
    pub fn on_request(&self) -> [u8; RELAY_PAYLOAD_LEN] {
        BridgeMetrics::bump(&self.ctx.metrics.relay_reads);
        self.payload().encode()
    }

    /// 当前载荷
    pub fn payload(&self) -> RelayPayload {
        let yaw = self.ctx.yaw.load().accumulated_yaw_deg;
        match self.extension {
            RelayExtension::None => RelayPayload::from_degrees(yaw, self.ctx.signal()),
            RelayExtension::ObstacleX => {
                // 信号字节与 x 取自同一份视觉快照，避免新颜色配旧坐标
                let (signal, x) = self
                    .ctx
                    .vision
                    .load()
                    .obstacle
                    .map_or((SIGNAL_NONE, 0), |o| (o.color_code, o.x));
                RelayPayload::from_degrees(yaw, signal).with_obstacle_x(x)
            },
        }
    }

    pub fn extension(&self) -> RelayExtension {
        self.extension
    }

    /// 主机最近写入的命令
    pub fn last_command(&self) -> Option<HostCommand> {
        self.ctx.last_command().map(HostCommand::from)
    }
}
