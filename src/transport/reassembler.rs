use std::time::Instant;

use super::{FRAME_END, FRAME_START};

/// 一帧完整的编码图像 (由 FRAME_END 触发生成, 之后不可变)
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    data: Vec<u8>,
    completed_at: Instant,
}

impl EncodedFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            completed_at: Instant::now(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 收到 FRAME_END 的时刻, 用于统计端到端延迟
    pub fn completed_at(&self) -> Instant {
        self.completed_at
    }
}

/// 单通道分片重组器
///
/// 每个通道同一时刻只有一个正在重组的缓冲区:
/// - `FRAME_START`: 丢弃未完成的数据
/// - `FRAME_END`:   输出当前缓冲区并清空
/// - 其他数据报:    追加; 追加后超过上限则先清空 (不保留部分旧数据, 避免坏帧传播)
///
/// 协议没有序号, 乱序/丢失的分片会得到损坏的帧, 由下游解码失败丢弃。
#[derive(Debug)]
pub struct ChunkReassembler {
    buffer: Vec<u8>,
    max_size: usize,
    overflow_resets: u64,
    frames_completed: u64,
    ends_received: u64,
}

impl ChunkReassembler {
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_size,
            overflow_resets: 0,
            frames_completed: 0,
            ends_received: 0,
        }
    }

    /// 处理一个数据报, 帧结束时返回完整帧
    pub fn feed(&mut self, datagram: &[u8]) -> Option<EncodedFrame> {
        if datagram == FRAME_START {
            self.buffer.clear();
            return None;
        }

        if datagram == FRAME_END {
            self.ends_received += 1;
            if self.buffer.is_empty() {
                return None;
            }
            self.frames_completed += 1;
            // 按上一帧大小预分配, 避免下一帧反复扩容
            let next = Vec::with_capacity(self.buffer.len());
            let data = std::mem::replace(&mut self.buffer, next);
            return Some(EncodedFrame::new(data));
        }

        if self.buffer.len() + datagram.len() > self.max_size {
            self.buffer.clear();
            self.overflow_resets += 1;
            // 单个分片本身就超过上限: 直接丢弃
            if datagram.len() > self.max_size {
                return None;
            }
        }
        self.buffer.extend_from_slice(datagram);
        None
    }

    /// 当前正在重组的字节数
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overflow_resets(&self) -> u64 {
        self.overflow_resets
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// 收到的 FRAME_END 总数 (包括空缓冲区的 END)
    pub fn ends_received(&self) -> u64 {
        self.ends_received
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn feed_all(r: &mut ChunkReassembler, datagrams: &[&[u8]]) -> Vec<EncodedFrame> {
        datagrams.iter().filter_map(|d| r.feed(d)).collect()
    }

    #[test]
    fn test_concatenates_fragments() {
        let mut r = ChunkReassembler::new(1024);
        let frames = feed_all(
            &mut r,
            &[FRAME_START, b"abc", b"de", b"fghij", FRAME_END],
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), b"abcdefghij");
        assert_eq!(r.pending(), 0);
        assert_eq!(r.frames_completed(), 1);
    }

    #[test]
    fn test_random_split_reassembles() {
        let mut rng = rand::thread_rng();
        let payload: Vec<u8> = (0..5000).map(|_| rng.gen()).collect();

        let mut r = ChunkReassembler::new(64 * 1024);
        assert!(r.feed(FRAME_START).is_none());
        let mut offset = 0;
        while offset < payload.len() {
            let len = rng.gen_range(1..=700).min(payload.len() - offset);
            assert!(r.feed(&payload[offset..offset + len]).is_none());
            offset += len;
        }
        let frame = r.feed(FRAME_END).unwrap();
        assert_eq!(frame.as_bytes(), payload.as_slice());
    }

    #[test]
    fn test_start_discards_partial_frame() {
        let mut r = ChunkReassembler::new(1024);
        let frames = feed_all(&mut r, &[FRAME_START, b"f1", FRAME_START, b"f2", FRAME_END]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), b"f2");
    }

    #[test]
    fn test_overflow_clears_before_append() {
        let mut r = ChunkReassembler::new(10);
        let frames = feed_all(
            &mut r,
            &[FRAME_START, b"123456", b"7890", b"abcd", FRAME_END],
        );
        // "123456" + "7890" 恰好 10 字节, "abcd" 触发清空
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), b"abcd");
        assert_eq!(r.overflow_resets(), 1);
    }

    #[test]
    fn test_buffer_never_exceeds_max() {
        let mut r = ChunkReassembler::new(8);
        let chunks: [&[u8]; 5] = [b"12345", b"678", b"9", b"0123456789abc", b"xy"];
        for chunk in chunks {
            r.feed(chunk);
            assert!(r.pending() <= r.max_size());
        }
        // 超大分片被直接丢弃
        assert_eq!(r.feed(FRAME_END).unwrap().as_bytes(), b"xy");
    }

    #[test]
    fn test_end_clears_buffer() {
        let mut r = ChunkReassembler::new(1024);
        let frames = feed_all(&mut r, &[b"one", FRAME_END, b"two", FRAME_END]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), b"one");
        assert_eq!(frames[1].as_bytes(), b"two");
    }

    #[test]
    fn test_end_without_data_yields_nothing() {
        let mut r = ChunkReassembler::new(1024);
        assert!(r.feed(FRAME_START).is_none());
        assert!(r.feed(FRAME_END).is_none());
        assert!(r.feed(FRAME_END).is_none());
        assert_eq!(r.frames_completed(), 0);
        // 空 END 不产生帧, 但仍计入统计
        assert_eq!(r.ends_received(), 2);
    }

    #[test]
    fn test_markers_must_match_exactly() {
        let mut r = ChunkReassembler::new(1024);
        // 以标记开头但不完全相等的数据报按普通分片处理
        let frames = feed_all(&mut r, &[b"FRAME_START!", b"FRAME_EN", FRAME_END]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), b"FRAME_START!FRAME_EN");
    }
}
