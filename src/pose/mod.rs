/// 姿态系统 (Pose System)
///
/// - LandmarkSet:      固定 33 点的关键点集合 + 输出文本协议
/// - PoseOracle:       姿态估计接口 (外部模型通过 trait 注入)
/// - LandmarkSmoother: 带死区的指数平滑滤波 (每通道一个实例)
pub mod landmark;
pub mod oracle;
pub mod smoother;

pub use landmark::{LandmarkPoint, LandmarkSet, LANDMARK_COUNT};
pub use oracle::{PoseOracle, StaticPoseOracle};
pub use smoother::{LandmarkSmoother, DEFAULT_MOVEMENT_THRESHOLD, DEFAULT_SMOOTHING_FACTOR};
