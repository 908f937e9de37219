//! 发送端分片
//!
//! 把一帧编码图像切成不超过 `MAX_CHUNK_SIZE` 的分片, 前后加上帧标记:
//! `FRAME_START, chunk_0, chunk_1, ..., FRAME_END`

use std::io;
use std::net::{SocketAddr, UdpSocket};

use super::{FRAME_END, FRAME_START, MAX_CHUNK_SIZE};

#[derive(Debug, Clone, Copy)]
pub struct FrameChunker {
    chunk_size: usize,
}

impl FrameChunker {
    /// `chunk_size` 限制在 `1..=MAX_CHUNK_SIZE`
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 一帧对应的全部数据报 (含首尾标记)
    pub fn datagrams<'a>(&self, frame: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        std::iter::once(FRAME_START)
            .chain(frame.chunks(self.chunk_size))
            .chain(std::iter::once(FRAME_END))
    }

    /// 把一帧发送到所有目标, 返回发送的数据报数量
    ///
    /// 任一目标发送失败时立即返回错误, 接收端会在下一个 FRAME_START 时丢弃残帧。
    pub fn send_frame(
        &self,
        socket: &UdpSocket,
        targets: &[SocketAddr],
        frame: &[u8],
    ) -> io::Result<usize> {
        let mut sent = 0;
        for target in targets {
            for datagram in self.datagrams(frame) {
                socket.send_to(datagram, target)?;
                sent += 1;
            }
        }
        Ok(sent)
    }
}

impl Default for FrameChunker {
    fn default() -> Self {
        Self::new(MAX_CHUNK_SIZE)
    }
}
