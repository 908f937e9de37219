//! 错误类型
//!
//! 帧级错误(解码/推理/发送)只在通道内部计数和记录,不会跨越通道边界;
//! 只有启动阶段的配置错误会让整个进程退出。

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// 结果发送失败 (fire-and-forget, 不重试)
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to send {len} bytes to {target}: {source}")]
    Io {
        target: SocketAddr,
        len: usize,
        #[source]
        source: io::Error,
    },

    #[error("short send to {target}: {sent} of {len} bytes")]
    Truncated {
        target: SocketAddr,
        sent: usize,
        len: usize,
    },
}

/// 单帧处理失败, 计入通道连续失败次数
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame decode failed: {0}")]
    Decode(#[source] anyhow::Error),

    #[error("pose oracle failed: {0}")]
    Oracle(#[source] anyhow::Error),

    #[error(transparent)]
    Send(#[from] SendError),
}

/// 通道启动失败,只影响当前通道
#[derive(Debug, thiserror::Error)]
pub enum LaneError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure UDP socket on {addr}: {source}")]
    SocketOption {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve address {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error("pose oracle for lane {input_port} failed to start: {source}")]
    Oracle {
        input_port: u16,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to spawn {role} thread for lane {input_port}: {source}")]
    Spawn {
        role: &'static str,
        input_port: u16,
        #[source]
        source: io::Error,
    },
}

/// 配置文件错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 输出文本协议解析错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("line {line}: expected 4 '|' separated fields, got {fields}")]
    FieldCount { line: usize, fields: usize },

    #[error("line {line}: invalid {field} value '{value}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: landmark index {index} out of range")]
    IndexOutOfRange { line: usize, index: usize },

    #[error("expected landmark index {expected}, got {found}")]
    UnexpectedIndex { expected: usize, found: usize },

    #[error("expected {expected} landmarks, got {found}")]
    WrongCount { expected: usize, found: usize },
}
