use super::landmark::{LandmarkPoint, LandmarkSet, LANDMARK_COUNT};

/// 默认平滑系数 (越大惯性越强)
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.7;
/// 默认最小运动阈值 (低于阈值的抖动被完全抑制)
pub const DEFAULT_MOVEMENT_THRESHOLD: f64 = 0.001;

/// 带死区的指数平滑滤波器
///
/// 每个关键点的每个轴独立处理:
/// - 变化量 `|cur - prev|` 超过阈值: `prev * F + cur * (1 - F)`
/// - 否则保持 `prev`
///
/// 单纯的指数滤波会让噪声慢慢随机漂移, 死区把这种漂移去掉,
/// 代价是缓慢的小幅运动延迟略有增加。
///
/// 状态按通道独立, 只由所属通道的处理线程访问。
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    smoothing_factor: f64,
    movement_threshold: f64,
    stable: Option<LandmarkSet>,
}

impl LandmarkSmoother {
    pub fn new(smoothing_factor: f64, movement_threshold: f64) -> Self {
        Self {
            smoothing_factor,
            movement_threshold,
            stable: None,
        }
    }

    pub fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    pub fn movement_threshold(&self) -> f64 {
        self.movement_threshold
    }

    /// 最近一次稳定输出
    pub fn stable(&self) -> Option<&LandmarkSet> {
        self.stable.as_ref()
    }

    /// `None` 表示本帧没有检测到人: 返回上一帧稳定结果 (从未检测到则为 `None`)。
    pub fn smooth(&mut self, current: Option<LandmarkSet>) -> Option<LandmarkSet> {
        let current = match current {
            Some(current) => current,
            None => return self.stable,
        };

        let previous = match self.stable {
            Some(previous) => previous,
            None => {
                // 首次检测: 没有历史, 原样返回
                self.stable = Some(current);
                return Some(current);
            }
        };

        let mut smoothed = [LandmarkPoint::default(); LANDMARK_COUNT];
        for (out, (cur, prev)) in smoothed
            .iter_mut()
            .zip(current.iter().zip(previous.iter()))
        {
            let cur = cur.axes();
            let prev = prev.axes();
            let mut axes = [0.0f64; 3];
            for axis in 0..3 {
                axes[axis] = self.filter_axis(prev[axis], cur[axis]);
            }
            *out = LandmarkPoint::from_axes(axes);
        }

        let result = LandmarkSet::new(smoothed);
        self.stable = Some(result);
        Some(result)
    }

    fn filter_axis(&self, previous: f64, current: f64) -> f64 {
        let movement = (current - previous).abs();
        if movement > self.movement_threshold {
            previous * self.smoothing_factor + current * (1.0 - self.smoothing_factor)
        } else {
            previous
        }
    }

    pub fn reset(&mut self) {
        self.stable = None;
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_FACTOR, DEFAULT_MOVEMENT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(x: f64, y: f64, z: f64) -> LandmarkSet {
        LandmarkSet::new([LandmarkPoint::new(x, y, z); LANDMARK_COUNT])
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_none_before_any_detection() {
        let mut s = LandmarkSmoother::default();
        assert_eq!(s.smooth(None), None);
        assert!(s.stable().is_none());
    }

    #[test]
    fn test_first_detection_passthrough() {
        let mut s = LandmarkSmoother::default();
        let first = uniform(0.3, -0.2, 0.9);
        assert_eq!(s.smooth(Some(first)), Some(first));
    }

    #[test]
    fn test_hold_last_value_is_bit_identical() {
        let mut s = LandmarkSmoother::default();
        s.smooth(Some(uniform(0.0, 0.0, 0.0)));
        let stable = s.smooth(Some(uniform(0.123456789, 0.5, -0.25))).unwrap();

        let held = s.smooth(None).unwrap();
        for (a, b) in held.iter().zip(stable.iter()) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
            assert_eq!(a.z.to_bits(), b.z.to_bits());
        }
        // 连续多次无检测仍然保持不变
        assert_eq!(s.smooth(None), Some(stable));
    }

    #[test]
    fn test_dead_zone_holds_previous() {
        let mut s = LandmarkSmoother::new(0.7, 0.001);
        s.smooth(Some(uniform(0.0, 0.0, 0.0)));
        let out = s.smooth(Some(uniform(0.0001, 0.0, 0.0))).unwrap();
        for p in out.iter() {
            assert_eq!(*p, LandmarkPoint::new(0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_blend_above_threshold() {
        let mut s = LandmarkSmoother::new(0.7, 0.001);
        s.smooth(Some(uniform(0.0, 0.0, 0.0)));
        let out = s.smooth(Some(uniform(1.0, 0.0, 0.0))).unwrap();
        for p in out.iter() {
            assert!(approx_eq(p.x, 0.3, 1e-12));
            assert_eq!(p.y, 0.0);
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn test_axes_filtered_independently() {
        let mut s = LandmarkSmoother::new(0.5, 0.01);
        s.smooth(Some(uniform(1.0, 1.0, 1.0)));
        // x 大幅移动, y 在死区内, z 反向大幅移动
        let out = s.smooth(Some(uniform(3.0, 1.005, -1.0))).unwrap();
        let p = out[7];
        assert!(approx_eq(p.x, 2.0, 1e-12));
        assert_eq!(p.y, 1.0);
        assert!(approx_eq(p.z, 0.0, 1e-12));
    }

    #[test]
    fn test_points_filtered_independently() {
        let mut s = LandmarkSmoother::new(0.7, 0.001);
        s.smooth(Some(uniform(0.0, 0.0, 0.0)));

        let mut moved = uniform(0.0, 0.0, 0.0);
        moved[5] = LandmarkPoint::new(1.0, 1.0, 1.0);
        let out = s.smooth(Some(moved)).unwrap();

        assert_eq!(out[4], LandmarkPoint::new(0.0, 0.0, 0.0));
        assert!(approx_eq(out[5].y, 0.3, 1e-12));
        assert_eq!(out[6], LandmarkPoint::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_converges_towards_target() {
        let mut s = LandmarkSmoother::new(0.7, 0.001);
        s.smooth(Some(uniform(0.0, 0.0, 0.0)));
        let mut last = 0.0;
        for _ in 0..20 {
            last = s.smooth(Some(uniform(1.0, 0.0, 0.0))).unwrap()[0].x;
        }
        // 剩余误差落入死区后停止移动
        assert!(last > 0.99 && last <= 1.0);
    }

    #[test]
    fn test_reset() {
        let mut s = LandmarkSmoother::default();
        s.smooth(Some(uniform(0.0, 0.0, 0.0)));
        s.reset();
        let next = uniform(5.0, 5.0, 5.0);
        assert_eq!(s.smooth(Some(next)), Some(next));
    }
}
