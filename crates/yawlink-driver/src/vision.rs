//! 视觉链路
//!
//! - [`FrameParser`]：解析一行文本并把结果发布到共享状态（信号字节、最近记录）
//! - [`VisionLink`]：从串口按字节组装行，超长行整行丢弃，长时间静默后重新同步

use crate::config::VisionConfig;
use crate::heartbeat::SilenceWatchdog;
use crate::metrics::BridgeMetrics;
use crate::state::BridgeContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use yawlink_hal::SerialLink;
use yawlink_protocol::{MAX_LINE_LEN, ParseError, VisionFrame, parse_line};

/// 视觉帧解析与发布
#[derive(Debug, Clone)]
pub struct FrameParser {
    ctx: Arc<BridgeContext>,
}

impl FrameParser {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        Self { ctx }
    }

    /// 解析一行并发布结果
    ///
    /// 障碍物帧更新信号字节和最近障碍物；标记帧只更新最近标记。
    /// 解析失败只计数并记录日志，不影响之前发布的状态。
    pub fn parse_line(&self, text: &str, now_ms: u64) -> Result<VisionFrame, ParseError> {
        match parse_line(text) {
            Ok(frame) => {
                self.publish(frame, now_ms);
                BridgeMetrics::bump(&self.ctx.metrics.frames_ok);
                trace!("Vision {} frame: {:?}", frame.kind(), frame);
                Ok(frame)
            },
            Err(e) => {
                self.reject(&e);
                Err(e)
            },
        }
    }

    fn reject(&self, error: &ParseError) {
        BridgeMetrics::bump(&self.ctx.metrics.frames_rejected);
        debug!("Discarding vision line: {}", error);
    }

    fn publish(&self, frame: VisionFrame, now_ms: u64) {
        let mut snapshot = *self.ctx.vision_snapshot();
        match frame {
            VisionFrame::Obstacle(obstacle) => {
                self.ctx.set_signal(obstacle.color_code);
                snapshot.obstacle = Some(obstacle);
            },
            VisionFrame::Marker(marker) => {
                snapshot.marker = Some(marker);
            },
        }
        snapshot.updated_at_ms = now_ms;
        self.ctx.publish_vision(snapshot);
    }
}

/// 单次 tick 的读取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisionTick {
    /// 读取的字节数
    pub bytes_read: usize,
    /// 完成的行数（含被拒绝的行）
    pub lines: usize,
    /// 本次 tick 是否执行了重新同步
    pub resynced: bool,
}

/// 串口行组装器
pub struct VisionLink<L> {
    link: L,
    parser: FrameParser,
    config: VisionConfig,
    line: [u8; MAX_LINE_LEN],
    /// 当前行已接收的字节数（可能超过缓冲区容量，超出部分被丢弃）
    len: usize,
    /// 最近接收的字节是否为 `\r`（只剥离行尾的一个）
    trailing_cr: bool,
    watchdog: SilenceWatchdog,
    /// 本次静默期间是否已重新同步
    resynced: bool,
}

impl<L: SerialLink> VisionLink<L> {
    pub fn new(link: L, parser: FrameParser, config: VisionConfig, now_ms: u64) -> Self {
        Self {
            watchdog: SilenceWatchdog::new(Duration::from_millis(config.silence_timeout_ms), now_ms),
            link,
            parser,
            config,
            line: [0; MAX_LINE_LEN],
            len: 0,
            trailing_cr: false,
            resynced: false,
        }
    }

    /// 读取当前可用字节（不超过每 tick 预算）并处理完整的行
    pub fn tick(&mut self, now_ms: u64) -> VisionTick {
        let mut report = VisionTick::default();
        let mut scratch = [0u8; 64];
        let mut budget = self.config.max_bytes_per_tick;

        while budget > 0 {
            let want = budget.min(scratch.len());
            let n = match self.link.read_available(&mut scratch[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    BridgeMetrics::bump(&self.parser.ctx.metrics.serial_errors);
                    warn!("Vision serial read failed: {}", e);
                    break;
                },
            };
            budget = budget.saturating_sub(n);
            report.bytes_read += n;
            for &byte in &scratch[..n] {
                if self.push_byte(byte, now_ms) {
                    report.lines += 1;
                }
            }
        }

        if report.bytes_read > 0 {
            self.watchdog.rearm(now_ms);
            self.resynced = false;
        } else if !self.resynced && self.watchdog.is_silent(now_ms) {
            self.resync(now_ms);
            report.resynced = true;
        }
        report
    }

    /// 当前未完成行的字节数
    pub fn pending_len(&self) -> usize {
        self.len
    }

    /// 返回是否完成了一行
    fn push_byte(&mut self, byte: u8, now_ms: u64) -> bool {
        match byte {
            b'\n' => {
                self.finish_line(now_ms);
                true
            },
            _ => {
                // 行内的 `\r` 照常存储并计入长度，交给解析器拒绝
                if self.len < MAX_LINE_LEN {
                    self.line[self.len] = byte;
                }
                self.len = self.len.saturating_add(1);
                self.trailing_cr = byte == b'\r';
                false
            },
        }
    }

    fn finish_line(&mut self, now_ms: u64) {
        let received = std::mem::take(&mut self.len);
        let len = received - usize::from(std::mem::take(&mut self.trailing_cr));
        if len > MAX_LINE_LEN {
            self.parser.reject(&ParseError::LineTooLong {
                len,
                max: MAX_LINE_LEN,
            });
            return;
        }

        match std::str::from_utf8(&self.line[..len]) {
            Ok(text) => {
                // 失败已由 FrameParser 计数
                let _ = self.parser.parse_line(text, now_ms);
            },
            Err(_) => self.parser.reject(&ParseError::InvalidEncoding),
        }
    }

    fn resync(&mut self, now_ms: u64) {
        warn!(
            "Vision link silent for {} ms, resynchronizing",
            self.watchdog.elapsed_ms(now_ms)
        );
        BridgeMetrics::bump(&self.parser.ctx.metrics.vision_resyncs);
        match self.link.discard_input() {
            Ok(0) => {},
            Ok(n) => debug!("Discarded {} stale vision bytes", n),
            Err(e) => {
                BridgeMetrics::bump(&self.parser.ctx.metrics.serial_errors);
                warn!("Vision serial drain failed: {}", e);
            },
        }
        self.len = 0;
        self.trailing_cr = false;
        self.resynced = true;
    }
}
