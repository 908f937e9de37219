// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 中继配置参数
pub mod error; // 错误类型
pub mod imaging; // 图像解码与缩放
pub mod lane; // 通道: 接收线程 + 处理线程 + 监管器
pub mod logging; // 日志初始化
pub mod pose; // 关键点类型 / 姿态估计接口 / 平滑滤波
pub mod stats; // 帧率与耗时统计
pub mod transport; // UDP 分片协议

pub use crate::config::{Args, LaneSpec, RelayConfig};
pub use crate::error::{ConfigError, FrameError, LaneError, SendError, WireError};
pub use crate::imaging::{FrameDecoder, ImageFrameDecoder};
pub use crate::lane::{
    FrameOutcome, LaneProcessor, LaneReceiver, LaneReport, LaneSupervisor, ProcessorExit,
    ReceiverExit, ShutdownSignal,
};
pub use crate::pose::{
    LandmarkPoint, LandmarkSet, LandmarkSmoother, PoseOracle, StaticPoseOracle, LANDMARK_COUNT,
};
pub use crate::transport::{
    frame_queue, ChunkReassembler, EncodedFrame, FrameChunker, FrameQueueConsumer,
    FrameQueueProducer, PushOutcome, QueuePoll, ResultSender, FRAME_END, FRAME_START,
    MAX_CHUNK_SIZE,
};
