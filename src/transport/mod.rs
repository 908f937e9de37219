/// UDP 分片传输协议 (Chunked Frame Transport)
///
/// 每个通道(摄像头)一条独立的 UDP 流:
/// ```text
/// FRAME_START → 分片 → 分片 → ... → FRAME_END
/// ```
/// - ChunkReassembler: 接收端分片重组 (每通道一个缓冲区)
/// - frame_queue:      接收线程 → 处理线程的有界队列 (满则丢弃新帧)
/// - ResultSender:     关键点结果发送 (fire-and-forget)
/// - FrameChunker:     发送端分片 (frame-sender 使用)
pub mod chunker;
pub mod queue;
pub mod reassembler;
pub mod sender;

pub use chunker::FrameChunker;
pub use queue::{frame_queue, FrameQueueConsumer, FrameQueueProducer, PushOutcome, QueuePoll};
pub use reassembler::{ChunkReassembler, EncodedFrame};
pub use sender::ResultSender;

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::LaneError;

/// 帧开始标记 (11 字节 ASCII)
pub const FRAME_START: &[u8] = b"FRAME_START";
/// 帧结束标记 (9 字节 ASCII)
pub const FRAME_END: &[u8] = b"FRAME_END";

/// 发送端单个分片的最大字节数 (低于 UDP 最大载荷 65507)
pub const MAX_CHUNK_SIZE: usize = 65000;

/// 接收缓冲区大小, 足够容纳任何 UDP 数据报
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// 解析 `host:port`, 取第一个地址
pub fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, LaneError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| LaneError::Resolve {
            host: host.to_string(),
            port,
        })
}
