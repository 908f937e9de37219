//! 帧率与耗时统计
//!
//! 接收线程与处理线程共用同一套计数方式: 累计帧数, 每隔固定时间
//! 结算一次 `count / elapsed` 并清零。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 一个统计周期的结算结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateReport {
    pub count: u64,
    pub dropped: u64,
    pub elapsed: Duration,
    pub fps: f64,
}

/// 周期性帧率计数器
#[derive(Debug, Clone)]
pub struct RateMeter {
    interval: Duration,
    count: u64,
    dropped: u64,
    last: Instant,
    current_fps: f64,
}

impl RateMeter {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            count: 0,
            dropped: 0,
            last: now,
            current_fps: 0.0,
        }
    }

    pub fn record(&mut self) {
        self.count += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// 最近一次结算的帧率
    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    pub fn poll(&mut self) -> Option<RateReport> {
        self.poll_at(Instant::now())
    }

    /// 到达统计周期时返回结算结果并开始新周期
    pub fn poll_at(&mut self, now: Instant) -> Option<RateReport> {
        let elapsed = now.saturating_duration_since(self.last);
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        self.current_fps = if secs > 0.0 {
            self.count as f64 / secs
        } else {
            0.0
        };
        let report = RateReport {
            count: self.count,
            dropped: self.dropped,
            elapsed,
            fps: self.current_fps,
        };

        self.last = now;
        self.count = 0;
        self.dropped = 0;
        Some(report)
    }
}

/// 最近 N 帧的处理耗时
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 平均耗时, 没有样本时为 `None`
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn average_ms(&self) -> f64 {
        self.average()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}
