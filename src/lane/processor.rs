//! 通道处理线程
//!
//! ```text
//! 出队 → FrameDecoder (解码+缩放) → PoseOracle → LandmarkSmoother → 文本协议 → ResultSender
//! ```
//! 解码/推理/发送失败累加连续失败次数, 任何一帧完整处理成功 (无论是否检测到人)
//! 都会清零; 达到上限后线程退出, 通道不会自动重启。

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::ShutdownSignal;
use crate::config::{LaneSpec, RelayConfig};
use crate::error::FrameError;
use crate::imaging::FrameDecoder;
use crate::pose::{LandmarkSmoother, PoseOracle};
use crate::stats::{LatencyWindow, RateMeter};
use crate::transport::{EncodedFrame, FrameQueueConsumer, QueuePoll, ResultSender};

/// 单帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// 已发送关键点
    Sent,
    /// 本帧没有检测到人, 不发送
    NoPose,
}

/// 处理线程退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorExit {
    Shutdown,
    /// 连续失败达到上限
    FailureCeiling { failures: u32 },
    /// 接收线程已退出且队列已取空
    QueueClosed,
}

pub struct LaneProcessor {
    lane: LaneSpec,
    queue: FrameQueueConsumer,
    decoder: Box<dyn FrameDecoder>,
    oracle: Box<dyn PoseOracle>,
    smoother: LandmarkSmoother,
    sender: ResultSender,
    max_failures: u32,
    consecutive_failures: u32,
    idle_sleep: Duration,
    meter: RateMeter,
    latency: LatencyWindow,
}

impl LaneProcessor {
    pub fn new(
        lane: LaneSpec,
        config: &RelayConfig,
        queue: FrameQueueConsumer,
        decoder: Box<dyn FrameDecoder>,
        oracle: Box<dyn PoseOracle>,
        sender: ResultSender,
    ) -> Self {
        Self {
            lane,
            queue,
            decoder,
            oracle,
            smoother: LandmarkSmoother::new(config.smoothing_factor, config.movement_threshold),
            sender,
            max_failures: config.max_consecutive_failures.max(1),
            consecutive_failures: 0,
            idle_sleep: config.idle_sleep(),
            meter: RateMeter::new(config.processor_stats_interval()),
            latency: LatencyWindow::new(config.latency_window),
        }
    }

    pub fn lane(&self) -> LaneSpec {
        self.lane
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// 处理一帧: 解码 → 推理 → 平滑 → 发送
    ///
    /// 本帧没有检测到人时不发送任何数据, 平滑器状态保持不变 (由下游保持上一帧姿态)。
    pub fn process_frame(&mut self, frame: &EncodedFrame) -> Result<FrameOutcome, FrameError> {
        let image = self
            .decoder
            .decode(frame.as_bytes())
            .map_err(FrameError::Decode)?;
        let detected = self.oracle.estimate(&image).map_err(FrameError::Oracle)?;

        let Some(detected) = detected else {
            return Ok(FrameOutcome::NoPose);
        };
        let Some(landmarks) = self.smoother.smooth(Some(detected)) else {
            return Ok(FrameOutcome::NoPose);
        };
        self.sender.send(landmarks.to_wire().as_bytes())?;
        Ok(FrameOutcome::Sent)
    }

    /// 处理循环, 直到停止信号、连续失败上限或接收线程退出
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> ProcessorExit {
        let port = self.lane.input_port;
        info!(
            port,
            output = %self.sender.target(),
            oracle = self.oracle.name(),
            "processor started"
        );

        loop {
            if shutdown.is_raised() {
                info!(port, "processor stopping");
                return ProcessorExit::Shutdown;
            }

            let frame = match self.queue.poll() {
                QueuePoll::Frame(frame) => frame,
                QueuePoll::Empty => {
                    thread::sleep(self.idle_sleep);
                    continue;
                }
                QueuePoll::Closed => {
                    info!(port, "receiver gone, processor stopping");
                    return ProcessorExit::QueueClosed;
                }
            };

            let started = Instant::now();
            match self.process_frame(&frame) {
                Ok(outcome) => {
                    self.consecutive_failures = 0;
                    if outcome == FrameOutcome::NoPose {
                        debug!(port, "no pose detected");
                    }
                }
                Err(err) => {
                    self.consecutive_failures += 1;
                    warn!(
                        port,
                        failures = self.consecutive_failures,
                        error = %err,
                        "frame failed"
                    );
                    if self.consecutive_failures >= self.max_failures {
                        error!(
                            port,
                            failures = self.consecutive_failures,
                            "too many consecutive failures, lane stopped"
                        );
                        return ProcessorExit::FailureCeiling {
                            failures: self.consecutive_failures,
                        };
                    }
                }
            }
            self.latency.push(started.elapsed());
            self.meter.record();

            if let Some(report) = self.meter.poll() {
                info!(
                    port,
                    fps = %format!("{:.1}", report.fps),
                    avg_ms = %format!("{:.1}", self.latency.average_ms()),
                    queued = self.queue.len(),
                    "processor stats"
                );
            }
        }
    }
}
