//! 通道监管器
//!
//! 启动阶段按配置逐个创建通道 (绑定端口, 创建姿态估计器), 单个通道失败只跳过该通道;
//! 运行阶段持有全部线程句柄, `shutdown()` 发出停止信号并等待所有线程结束。

use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use super::{LaneProcessor, LaneReceiver, ProcessorExit, ReceiverExit, ShutdownSignal};
use crate::config::{LaneSpec, RelayConfig};
use crate::error::LaneError;
use crate::imaging::{FrameDecoder, ImageFrameDecoder};
use crate::pose::PoseOracle;
use crate::transport::{frame_queue, ResultSender};

/// 单个通道的线程句柄
struct LaneHandle {
    lane: LaneSpec,
    local_addr: Option<SocketAddr>,
    receiver: JoinHandle<ReceiverExit>,
    processor: JoinHandle<ProcessorExit>,
}

impl LaneHandle {
    fn is_running(&self) -> bool {
        !self.receiver.is_finished() || !self.processor.is_finished()
    }
}

/// 通道结束时的状态 (`None` 表示线程 panic)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneReport {
    pub lane: LaneSpec,
    pub receiver: Option<ReceiverExit>,
    pub processor: Option<ProcessorExit>,
}

pub struct LaneSupervisor {
    shutdown: ShutdownSignal,
    lanes: Vec<LaneHandle>,
    failed: Vec<(LaneSpec, LaneError)>,
}

impl LaneSupervisor {
    /// 使用 `ImageFrameDecoder` 启动全部通道
    pub fn start<O>(config: &RelayConfig, oracle_factory: O) -> Self
    where
        O: FnMut(&LaneSpec) -> Result<Box<dyn PoseOracle>>,
    {
        let (width, height) = (config.process_width, config.process_height);
        Self::start_with(config, oracle_factory, move |_: &LaneSpec| {
            Box::new(ImageFrameDecoder::new(width, height)) as Box<dyn FrameDecoder>
        })
    }

    /// 启动全部通道, 解码器与姿态估计器由调用方按通道创建
    pub fn start_with<O, D>(
        config: &RelayConfig,
        mut oracle_factory: O,
        mut decoder_factory: D,
    ) -> Self
    where
        O: FnMut(&LaneSpec) -> Result<Box<dyn PoseOracle>>,
        D: FnMut(&LaneSpec) -> Box<dyn FrameDecoder>,
    {
        let shutdown = ShutdownSignal::new();
        let mut lanes = Vec::new();
        let mut failed = Vec::new();

        for lane in config.lanes() {
            match start_lane(lane, config, &shutdown, &mut oracle_factory, &mut decoder_factory) {
                Ok(handle) => {
                    info!(
                        input = lane.input_port,
                        output = lane.output_port,
                        "lane started"
                    );
                    lanes.push(handle);
                }
                Err(err) => {
                    error!(input = lane.input_port, error = %err, "lane failed to start, skipped");
                    failed.push((lane, err));
                }
            }
        }

        info!(
            started = lanes.len(),
            failed = failed.len(),
            "relay running"
        );
        Self {
            shutdown,
            lanes,
            failed,
        }
    }

    /// 停止信号 (交给 Ctrl-C 处理函数等外部触发者)
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// 成功启动的通道
    pub fn started_lanes(&self) -> Vec<LaneSpec> {
        self.lanes.iter().map(|h| h.lane).collect()
    }

    /// 仍有线程在运行的通道
    pub fn running_lanes(&self) -> Vec<LaneSpec> {
        self.lanes
            .iter()
            .filter(|h| h.is_running())
            .map(|h| h.lane)
            .collect()
    }

    /// 启动失败的通道及原因
    pub fn failed_lanes(&self) -> &[(LaneSpec, LaneError)] {
        &self.failed
    }

    /// 通道输入端口实际绑定的地址
    pub fn local_addr(&self, input_port: u16) -> Option<SocketAddr> {
        self.lanes
            .iter()
            .find(|h| h.lane.input_port == input_port)
            .and_then(|h| h.local_addr)
    }

    /// 阻塞直到收到停止信号或所有通道都已结束
    pub fn wait(&self, poll: Duration) {
        while !self.shutdown.is_raised() && self.lanes.iter().any(LaneHandle::is_running) {
            thread::sleep(poll);
        }
    }

    /// 发出停止信号并等待全部线程结束
    pub fn shutdown(self) -> Vec<LaneReport> {
        self.shutdown.raise();
        self.lanes
            .into_iter()
            .map(|handle| {
                let receiver = handle.receiver.join().ok();
                let processor = handle.processor.join().ok();
                if receiver.is_none() || processor.is_none() {
                    warn!(input = handle.lane.input_port, "lane thread panicked");
                }
                LaneReport {
                    lane: handle.lane,
                    receiver,
                    processor,
                }
            })
            .collect()
    }
}

fn start_lane<O, D>(
    lane: LaneSpec,
    config: &RelayConfig,
    shutdown: &ShutdownSignal,
    oracle_factory: &mut O,
    decoder_factory: &mut D,
) -> Result<LaneHandle, LaneError>
where
    O: FnMut(&LaneSpec) -> Result<Box<dyn PoseOracle>>,
    D: FnMut(&LaneSpec) -> Box<dyn FrameDecoder>,
{
    let (producer, consumer) = frame_queue(config.queue_capacity);
    let mut receiver = LaneReceiver::bind(lane, config, producer)?;
    let sender = ResultSender::bind(&config.output_host, lane.output_port)?;
    let oracle = oracle_factory(&lane).map_err(|source| LaneError::Oracle {
        input_port: lane.input_port,
        source,
    })?;
    let decoder = decoder_factory(&lane);
    let local_addr = receiver.local_addr();

    let mut processor = LaneProcessor::new(lane, config, consumer, decoder, oracle, sender);

    // 先启动处理线程: 接收线程启动失败时处理线程会因队列关闭自行退出
    let signal = shutdown.clone();
    let processor = thread::Builder::new()
        .name(format!("proc-{}", lane.input_port))
        .spawn(move || processor.run(&signal))
        .map_err(|source| LaneError::Spawn {
            role: "processor",
            input_port: lane.input_port,
            source,
        })?;

    let signal = shutdown.clone();
    let spawned = thread::Builder::new()
        .name(format!("recv-{}", lane.input_port))
        .spawn(move || receiver.run(&signal));
    let receiver = match spawned {
        Ok(handle) => handle,
        Err(source) => {
            reap_processor(lane, processor);
            return Err(LaneError::Spawn {
                role: "receiver",
                input_port: lane.input_port,
                source,
            });
        }
    };

    Ok(LaneHandle {
        lane,
        local_addr,
        receiver,
        processor,
    })
}

/// 接收线程启动失败后等待处理线程退出
///
/// 接收端随启动失败的闭包一起被丢弃, 处理线程会看到队列关闭并自行结束。
fn reap_processor(
    lane: LaneSpec,
    processor: JoinHandle<ProcessorExit>,
) -> Option<ProcessorExit> {
    let exit = processor.join().ok();
    match exit {
        Some(exit) => info!(input = lane.input_port, ?exit, "processor joined after failed start"),
        None => warn!(input = lane.input_port, "processor panicked after failed start"),
    }
    exit
}
