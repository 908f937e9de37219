/// 通道系统 (Lane System)
///
/// 每个通道两个独立线程, 通过有界队列连接:
/// - LaneReceiver:  UDP 接收 + 分片重组 + 入队 (独立线程)
/// - LaneProcessor: 出队 → 解码 → 姿态估计 → 平滑 → 发送 (独立线程)
/// - LaneSupervisor: 按配置创建全部通道, 持有停止信号和线程句柄
///
/// 通道之间不共享任何帧状态, 唯一共享的是 `ShutdownSignal`。
pub mod processor;
pub mod receiver;
pub mod supervisor;

pub use processor::{FrameOutcome, LaneProcessor, ProcessorExit};
pub use receiver::{LaneReceiver, ReceiverExit};
pub use supervisor::{LaneReport, LaneSupervisor};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 停止信号, 克隆后传给每个线程
///
/// 各线程在每次循环开始时检查, 观察延迟不超过一次接收超时。
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    raised: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let seen_by_worker = signal.clone();
        assert!(!seen_by_worker.is_raised());

        let handle = std::thread::spawn(move || {
            while !seen_by_worker.is_raised() {
                std::thread::yield_now();
            }
        });
        signal.raise();
        handle.join().unwrap();
        assert!(signal.is_raised());
    }
}
