//! 通道接收线程
//!
//! ```text
//! UDP 数据报 → ChunkReassembler → EncodedFrame → 有界队列 (满则丢弃)
//! ```
//! 接收超时 100ms, 每次超时都会检查停止信号; 连续超时达到上限时
//! 标记通道空闲 (只记录日志, 线程继续运行)。

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use super::ShutdownSignal;
use crate::config::{LaneSpec, RelayConfig};
use crate::error::LaneError;
use crate::stats::RateMeter;
use crate::transport::{
    resolve_addr, ChunkReassembler, FrameQueueProducer, PushOutcome, MAX_DATAGRAM_SIZE,
};

/// 接收线程退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// 收到停止信号
    Shutdown,
    /// 处理线程已退出, 继续接收没有意义
    QueueClosed,
}

pub struct LaneReceiver {
    lane: LaneSpec,
    socket: UdpSocket,
    reassembler: ChunkReassembler,
    queue: FrameQueueProducer,
    idle_timeout_count: u32,
    stats_interval: Duration,
    recv_buf: Vec<u8>,
}

impl LaneReceiver {
    /// 绑定输入端口 (SO_REUSEADDR + 指定接收缓冲区 + 读超时)
    pub fn bind(
        lane: LaneSpec,
        config: &RelayConfig,
        queue: FrameQueueProducer,
    ) -> Result<Self, LaneError> {
        let addr = resolve_addr(&config.bind_host, lane.input_port)?;
        let socket = bind_udp(addr, config.recv_buffer_size, config.read_timeout())?;

        Ok(Self {
            lane,
            socket,
            reassembler: ChunkReassembler::new(config.max_buffer_size),
            queue,
            idle_timeout_count: config.idle_timeout_count,
            stats_interval: config.receiver_stats_interval(),
            recv_buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn lane(&self) -> LaneSpec {
        self.lane
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    /// 接收循环, 直到停止信号或处理线程退出
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> ReceiverExit {
        let port = self.lane.input_port;
        let mut meter = RateMeter::new(self.stats_interval);
        let mut consecutive_timeouts: u32 = 0;
        let mut idle = false;

        info!(port, "receiver started");

        loop {
            if shutdown.is_raised() {
                info!(port, "receiver stopping");
                return ReceiverExit::Shutdown;
            }

            match self.socket.recv(&mut self.recv_buf) {
                Ok(len) => {
                    consecutive_timeouts = 0;
                    if idle {
                        idle = false;
                        info!(port, "lane traffic resumed");
                    }

                    let ends_before = self.reassembler.ends_received();
                    let completed = self.reassembler.feed(&self.recv_buf[..len]);
                    // 每个 FRAME_END 都计数, 与是否产生帧、是否被丢弃无关
                    if self.reassembler.ends_received() > ends_before {
                        meter.record();
                    }
                    if let Some(frame) = completed {
                        match self.queue.push(frame) {
                            PushOutcome::Queued => {}
                            PushOutcome::Dropped => {
                                meter.record_dropped();
                                debug!(port, "queue full, frame dropped");
                            }
                            PushOutcome::Closed => {
                                warn!(port, "processor gone, receiver stopping");
                                return ReceiverExit::QueueClosed;
                            }
                        }
                    }
                }
                Err(err) => {
                    if !is_timeout(&err) {
                        warn!(port, error = %err, "receive error");
                    }
                    consecutive_timeouts = consecutive_timeouts.saturating_add(1);
                    if !idle && consecutive_timeouts >= self.idle_timeout_count {
                        idle = true;
                        info!(
                            port,
                            timeouts = consecutive_timeouts,
                            "lane idle, no data received"
                        );
                    }
                }
            }

            if let Some(report) = meter.poll() {
                if report.count > 0 || report.dropped > 0 {
                    info!(
                        port,
                        fps = %format!("{:.1}", report.fps),
                        frames = report.count,
                        dropped = report.dropped,
                        overflow_resets = self.reassembler.overflow_resets(),
                        "receiver stats"
                    );
                }
            }
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// 创建并绑定 UDP 套接字
fn bind_udp(
    addr: SocketAddr,
    recv_buffer: usize,
    timeout: Duration,
) -> Result<UdpSocket, LaneError> {
    let option_err = |source: io::Error| LaneError::SocketOption { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(|source| LaneError::Bind { addr, source })?;
    socket.set_reuse_address(true).map_err(option_err)?;
    socket.set_recv_buffer_size(recv_buffer).map_err(option_err)?;
    socket
        .bind(&addr.into())
        .map_err(|source| LaneError::Bind { addr, source })?;
    socket.set_read_timeout(Some(timeout)).map_err(option_err)?;

    Ok(socket.into())
}
