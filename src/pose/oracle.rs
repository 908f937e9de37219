//! 姿态估计接口 (外部协作者)
//!
//! ## PoseOracle Trait
//! 统一的姿态估计接口: 输入处理分辨率下的 RGB 图像, 输出 33 个关键点或 `None`。
//!
//! ```text
//! 编码帧 → FrameDecoder → RgbImage
//!                  ↓
//!         PoseOracle::estimate
//!                  ↓
//!     Some(LandmarkSet) / None(画面中无人)
//! ```
//!
//! 具体模型(MediaPipe / ONNX 等)不在本 crate 内实现, 通过 trait 注入;
//! 测试中用确定性的桩实现替换。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;

use super::landmark::{LandmarkPoint, LandmarkSet, LANDMARK_COUNT};

/// 姿态估计能力
///
/// 每个通道拥有独立实例, 只在该通道的处理线程中调用。
pub trait PoseOracle: Send {
    /// 对单帧图像做姿态估计
    ///
    /// # Returns
    /// * `Ok(Some(set))` - 检测到人
    /// * `Ok(None)` - 画面中无人
    /// * `Err(_)` - 推理失败, 计入通道连续失败次数
    fn estimate(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>>;

    /// 名称, 用于日志
    fn name(&self) -> &str;
}

/// 固定姿态: 对任何输入都返回同一组关键点
///
/// 没有模型时用于联调下游渲染端, 也是测试用的确定性实现。
#[derive(Debug, Clone)]
pub struct StaticPoseOracle {
    pose: LandmarkSet,
}

impl StaticPoseOracle {
    pub fn new(pose: LandmarkSet) -> Self {
        Self { pose }
    }

    /// 站立姿态 (世界坐标, 原点在髋部中心, y 轴向下, 单位米)
    pub fn neutral() -> Self {
        let mut points = [LandmarkPoint::default(); LANDMARK_COUNT];
        for (slot, &(x, y, z)) in points.iter_mut().zip(NEUTRAL_POSE.iter()) {
            *slot = LandmarkPoint::new(x, y, z);
        }
        Self::new(LandmarkSet::new(points))
    }

    /// 从输出文本协议格式的文件加载姿态
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read(path)
            .with_context(|| format!("failed to read pose file {}", path.display()))?;
        let pose = LandmarkSet::parse_wire(&text)
            .with_context(|| format!("invalid pose file {}", path.display()))?;
        Ok(Self::new(pose))
    }

    pub fn pose(&self) -> &LandmarkSet {
        &self.pose
    }
}

impl PoseOracle for StaticPoseOracle {
    fn estimate(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>> {
        Ok(Some(self.pose))
    }

    fn name(&self) -> &str {
        "static"
    }
}

const NEUTRAL_POSE: [(f64, f64, f64); LANDMARK_COUNT] = [
    (0.0, -0.62, -0.10),     // nose
    (-0.02, -0.66, -0.09),   // left eye inner
    (-0.035, -0.66, -0.09),  // left eye
    (-0.05, -0.66, -0.09),   // left eye outer
    (0.02, -0.66, -0.09),    // right eye inner
    (0.035, -0.66, -0.09),   // right eye
    (0.05, -0.66, -0.09),    // right eye outer
    (-0.08, -0.64, -0.02),   // left ear
    (0.08, -0.64, -0.02),    // right ear
    (-0.025, -0.58, -0.09),  // mouth left
    (0.025, -0.58, -0.09),   // mouth right
    (-0.17, -0.45, 0.0),     // left shoulder
    (0.17, -0.45, 0.0),      // right shoulder
    (-0.20, -0.20, 0.02),    // left elbow
    (0.20, -0.20, 0.02),     // right elbow
    (-0.21, 0.03, 0.0),      // left wrist
    (0.21, 0.03, 0.0),       // right wrist
    (-0.22, 0.08, 0.0),      // left pinky
    (0.22, 0.08, 0.0),       // right pinky
    (-0.21, 0.09, -0.01),    // left index
    (0.21, 0.09, -0.01),     // right index
    (-0.19, 0.06, -0.02),    // left thumb
    (0.19, 0.06, -0.02),     // right thumb
    (-0.10, 0.0, 0.0),       // left hip
    (0.10, 0.0, 0.0),        // right hip
    (-0.10, 0.40, 0.01),     // left knee
    (0.10, 0.40, 0.01),      // right knee
    (-0.10, 0.80, 0.04),     // left ankle
    (0.10, 0.80, 0.04),      // right ankle
    (-0.10, 0.84, 0.07),     // left heel
    (0.10, 0.84, 0.07),      // right heel
    (-0.10, 0.86, -0.06),    // left foot index
    (0.10, 0.86, -0.06),     // right foot index
];
