//! 有界帧队列 (接收线程 → 处理线程)
//!
//! 基于 `crossbeam_channel::bounded`, 单生产者单消费者。
//! 队列满时 `push` 丢弃新帧 (drop-newest), 保留已缓冲的帧; 不向发送端施加背压。

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use super::reassembler::EncodedFrame;

/// 入队结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// 队列已满, 新帧被丢弃
    Dropped,
    /// 消费端已退出 (处理线程终止)
    Closed,
}

/// 非阻塞出队结果
#[derive(Debug)]
pub enum QueuePoll {
    Frame(EncodedFrame),
    Empty,
    /// 队列为空且生产端已退出
    Closed,
}

/// 创建一对队列端点, `capacity` 至少为 1
pub fn frame_queue(capacity: usize) -> (FrameQueueProducer, FrameQueueConsumer) {
    let capacity = capacity.max(1);
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (
        FrameQueueProducer { tx, capacity },
        FrameQueueConsumer { rx, capacity },
    )
}

/// 生产端 (接收线程持有)
#[derive(Debug)]
pub struct FrameQueueProducer {
    tx: Sender<EncodedFrame>,
    capacity: usize,
}

impl FrameQueueProducer {
    /// 非阻塞入队, 满则丢弃新帧
    pub fn push(&self, frame: EncodedFrame) -> PushOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => PushOutcome::Dropped,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// 消费端 (处理线程持有)
#[derive(Debug)]
pub struct FrameQueueConsumer {
    rx: Receiver<EncodedFrame>,
    capacity: usize,
}

impl FrameQueueConsumer {
    /// 非阻塞出队, 空队列返回 `None`
    pub fn pop(&self) -> Option<EncodedFrame> {
        self.rx.try_recv().ok()
    }

    /// 与 `pop` 相同, 但区分 "暂时为空" 和 "生产端已退出"
    pub fn poll(&self) -> QueuePoll {
        match self.rx.try_recv() {
            Ok(frame) => QueuePoll::Frame(frame),
            Err(TryRecvError::Empty) => QueuePoll::Empty,
            Err(TryRecvError::Disconnected) => QueuePoll::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
