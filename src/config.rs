//! 中继配置 - JSON 文件 + 命令行覆盖
//!
//! 配置在进程启动时确定, 运行期间不再变化。

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 一条通道: 输入端口 (接收分片) → 输出端口 (发送关键点)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneSpec {
    pub input_port: u16,
    pub output_port: u16,
}

/// 中继参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    // === 网络 ===
    pub input_ports: Vec<u16>,     // 每个摄像头一个输入端口
    pub output_port_offset: u16,   // 输出端口 = 输入端口 + 偏移
    pub bind_host: String,         // 输入端口绑定地址
    pub output_host: String,       // 关键点发送目标地址
    pub recv_buffer_size: usize,   // 内核接收缓冲区 (SO_RCVBUF)
    pub read_timeout_ms: u64,      // 单次接收超时
    pub idle_timeout_count: u32,   // 连续超时多少次判定通道空闲

    // === 重组与队列 ===
    pub max_buffer_size: usize,    // 单帧重组缓冲区上限
    pub queue_capacity: usize,     // 每通道待处理帧队列容量

    // === 处理 ===
    pub process_width: u32,            // 姿态估计输入宽度
    pub process_height: u32,           // 姿态估计输入高度
    pub max_consecutive_failures: u32, // 连续失败上限, 达到后处理线程退出
    pub idle_sleep_ms: u64,            // 队列为空时的休眠

    // === 平滑滤波 ===
    pub smoothing_factor: f64,   // 平滑系数 F, (0, 1)
    pub movement_threshold: f64, // 死区阈值

    // === 统计 ===
    pub receiver_stats_interval_ms: u64,
    pub processor_stats_interval_ms: u64,
    pub latency_window: usize, // 平均耗时统计的帧数
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            input_ports: (52700..=52707).collect(),
            output_port_offset: 33,
            bind_host: "0.0.0.0".to_string(),
            output_host: "127.0.0.1".to_string(),
            recv_buffer_size: 512 * 1024,
            read_timeout_ms: 100,
            idle_timeout_count: 50,

            max_buffer_size: 512 * 1024,
            queue_capacity: 3,

            process_width: 320,
            process_height: 240,
            max_consecutive_failures: 100,
            idle_sleep_ms: 1,

            smoothing_factor: 0.7,
            movement_threshold: 0.001,

            receiver_stats_interval_ms: 2000,
            processor_stats_interval_ms: 3000,
            latency_window: 30,
        }
    }
}

impl RelayConfig {
    /// 从JSON文件加载配置 (缺失字段使用默认值)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 加载配置, 文件不存在时写入一份默认配置
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let config = Self::load(path)?;
            tracing::info!(path = %path.display(), "config loaded");
            return Ok(config);
        }

        let config = Self::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "config not found, wrote defaults");
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 检查配置是否可用, 不可用时进程不应启动
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.input_ports.is_empty() {
            return invalid("no input ports configured".into());
        }
        let mut inputs = HashSet::new();
        for &port in &self.input_ports {
            if port == 0 {
                return invalid("input port 0 is not allowed".into());
            }
            if !inputs.insert(port) {
                return invalid(format!("input port {} listed twice", port));
            }
        }
        for &port in &self.input_ports {
            let Some(output) = port.checked_add(self.output_port_offset) else {
                return invalid(format!(
                    "output port for {} + {} exceeds 65535",
                    port, self.output_port_offset
                ));
            };
            if inputs.contains(&output) {
                return invalid(format!(
                    "output port {} of lane {} collides with an input port",
                    output, port
                ));
            }
        }

        if self.bind_host.trim().is_empty() || self.output_host.trim().is_empty() {
            return invalid("bind_host and output_host must not be empty".into());
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor < 1.0) {
            return invalid(format!(
                "smoothing_factor {} must be in (0, 1)",
                self.smoothing_factor
            ));
        }
        if self.movement_threshold.is_nan() || self.movement_threshold < 0.0 {
            return invalid(format!(
                "movement_threshold {} must be >= 0",
                self.movement_threshold
            ));
        }
        if self.process_width == 0 || self.process_height == 0 {
            return invalid(format!(
                "processing size {}x{} is empty",
                self.process_width, self.process_height
            ));
        }

        let positive: [(&str, u64); 10] = [
            ("queue_capacity", self.queue_capacity as u64),
            ("max_buffer_size", self.max_buffer_size as u64),
            ("recv_buffer_size", self.recv_buffer_size as u64),
            ("read_timeout_ms", self.read_timeout_ms),
            ("idle_timeout_count", u64::from(self.idle_timeout_count)),
            ("max_consecutive_failures", u64::from(self.max_consecutive_failures)),
            ("idle_sleep_ms", self.idle_sleep_ms),
            ("latency_window", self.latency_window as u64),
            ("receiver_stats_interval_ms", self.receiver_stats_interval_ms),
            ("processor_stats_interval_ms", self.processor_stats_interval_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                return invalid(format!("{} must be at least 1", name));
            }
        }

        Ok(())
    }

    /// 按输入端口顺序生成通道列表
    pub fn lanes(&self) -> Vec<LaneSpec> {
        self.input_ports
            .iter()
            .map(|&input_port| LaneSpec {
                input_port,
                output_port: input_port.saturating_add(self.output_port_offset),
            })
            .collect()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn receiver_stats_interval(&self) -> Duration {
        Duration::from_millis(self.receiver_stats_interval_ms)
    }

    pub fn processor_stats_interval(&self) -> Duration {
        Duration::from_millis(self.processor_stats_interval_ms)
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        tracing::info!(
            lanes = self.input_ports.len(),
            bind_host = %self.bind_host,
            output_host = %self.output_host,
            offset = self.output_port_offset,
            size = %format!("{}x{}", self.process_width, self.process_height),
            smoothing = self.smoothing_factor,
            threshold = self.movement_threshold,
            queue = self.queue_capacity,
            max_failures = self.max_consecutive_failures,
            "relay config"
        );
    }
}

/// 姿态中继命令行参数
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "多通道UDP姿态中继", long_about = None)]
pub struct Args {
    /// JSON配置文件 (不存在时写入默认配置)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输入端口列表, 逗号分隔 (覆盖配置文件)
    #[arg(short, long, value_delimiter = ',')]
    pub ports: Vec<u16>,

    /// 输入端口绑定地址
    #[arg(long)]
    pub bind_host: Option<String>,

    /// 关键点发送目标地址
    #[arg(long)]
    pub output_host: Option<String>,

    /// 输出端口偏移
    #[arg(long)]
    pub offset: Option<u16>,

    /// 固定姿态文件 (输出文本协议格式), 缺省使用内置站立姿态
    #[arg(long)]
    pub pose_file: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 读取配置文件 (如果指定) 并应用命令行覆盖
    pub fn resolve(&self) -> Result<RelayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load_or_default(path)?,
            None => RelayConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// 命令行参数优先于配置文件
    pub fn apply(&self, config: &mut RelayConfig) {
        if !self.ports.is_empty() {
            config.input_ports = self.ports.clone();
        }
        if let Some(host) = &self.bind_host {
            config.bind_host = host.clone();
        }
        if let Some(host) = &self.output_host {
            config.output_host = host.clone();
        }
        if let Some(offset) = self.offset {
            config.output_port_offset = offset;
        }
    }
}
