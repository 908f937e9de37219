//! 关键点类型与输出文本协议
//!
//! 每帧输出 33 行 `<index>|<x:.6f>|<y:.6f>|<z:.6f>\n`, 索引 0..32, 以换行结尾。

use std::fmt::Write as _;
use std::ops::{Index, IndexMut};

use crate::error::WireError;

/// 姿态估计输出的固定关键点数量 (索引有语义: 0 永远是同一个身体部位)
pub const LANDMARK_COUNT: usize = 33;

/// 单个关键点 (姿态估计坐标空间)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LandmarkPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_axes(axes: [f64; 3]) -> Self {
        Self::new(axes[0], axes[1], axes[2])
    }
}

/// 一帧完整姿态: 固定 33 个关键点, 顺序有意义
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkSet {
    points: [LandmarkPoint; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [LandmarkPoint; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// 从迭代器构造, 必须恰好 33 个点
    pub fn try_from_points<I>(points: I) -> Result<Self, WireError>
    where
        I: IntoIterator<Item = LandmarkPoint>,
    {
        let mut out = [LandmarkPoint::default(); LANDMARK_COUNT];
        let mut found = 0;
        for point in points {
            if found < LANDMARK_COUNT {
                out[found] = point;
            }
            found += 1;
        }
        if found != LANDMARK_COUNT {
            return Err(WireError::WrongCount {
                expected: LANDMARK_COUNT,
                found,
            });
        }
        Ok(Self { points: out })
    }

    pub fn points(&self) -> &[LandmarkPoint; LANDMARK_COUNT] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &LandmarkPoint> {
        self.points.iter()
    }

    /// 序列化为输出文本协议
    pub fn to_wire(&self) -> String {
        // 每行最多约 40 字节
        let mut out = String::with_capacity(LANDMARK_COUNT * 40);
        for (i, p) in self.points.iter().enumerate() {
            // 写入 String 不会失败
            let _ = writeln!(out, "{}|{:.6}|{:.6}|{:.6}", i, p.x, p.y, p.z);
        }
        out
    }

    /// 解析输出文本协议 (下游消费者 / 测试使用)
    pub fn parse_wire(payload: &[u8]) -> Result<Self, WireError> {
        let text = std::str::from_utf8(payload).map_err(|_| WireError::NotUtf8)?;
        let mut points = [LandmarkPoint::default(); LANDMARK_COUNT];
        let mut count = 0;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() != 4 {
                return Err(WireError::FieldCount {
                    line: line_no + 1,
                    fields: fields.len(),
                });
            }

            let index: usize = fields[0].parse().map_err(|_| WireError::InvalidNumber {
                line: line_no + 1,
                field: "index",
                value: fields[0].to_string(),
            })?;
            if index >= LANDMARK_COUNT {
                return Err(WireError::IndexOutOfRange {
                    line: line_no + 1,
                    index,
                });
            }
            if index != count {
                return Err(WireError::UnexpectedIndex {
                    expected: count,
                    found: index,
                });
            }

            let mut axes = [0.0f64; 3];
            for (slot, (name, raw)) in axes
                .iter_mut()
                .zip(["x", "y", "z"].into_iter().zip(&fields[1..]))
            {
                *slot = raw.parse().map_err(|_| WireError::InvalidNumber {
                    line: line_no + 1,
                    field: name,
                    value: raw.to_string(),
                })?;
            }
            points[index] = LandmarkPoint::from_axes(axes);
            count += 1;
        }

        if count != LANDMARK_COUNT {
            return Err(WireError::WrongCount {
                expected: LANDMARK_COUNT,
                found: count,
            });
        }
        Ok(Self { points })
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self {
            points: [LandmarkPoint::default(); LANDMARK_COUNT],
        }
    }
}

impl Index<usize> for LandmarkSet {
    type Output = LandmarkPoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl IndexMut<usize> for LandmarkSet {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.points[index]
    }
}
