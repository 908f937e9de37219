/// 编码图像分片发送 - 代替摄像头端, 把图像文件按固定帧率发送到一个或多个通道
///
/// 运行: cargo run --bin frame-sender -- frames/ --targets 127.0.0.1:52700,127.0.0.1:52701 --fps 30
use std::fs;
use std::io::Cursor;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::codecs::jpeg::JpegEncoder;
use tracing::{info, warn};

use pose_relay::logging::init_logging;
use pose_relay::stats::RateMeter;
use pose_relay::transport::{FrameChunker, MAX_CHUNK_SIZE};
use pose_relay::ShutdownSignal;

/// 分片发送程序
#[derive(Parser, Debug)]
#[command(author, version, about = "分片发送编码图像到姿态中继", long_about = None)]
struct Args {
    /// 图像文件或目录 (目录内的 jpg/png 按文件名排序)
    input: PathBuf,

    /// 目标地址, 逗号分隔
    #[arg(short, long, value_delimiter = ',', default_value = "127.0.0.1:52700")]
    targets: Vec<String>,

    /// 发送帧率
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// 循环发送
    #[arg(short, long)]
    repeat: bool,

    /// 分片大小 (字节)
    #[arg(long, default_value_t = MAX_CHUNK_SIZE)]
    chunk_size: usize,

    /// 发送前重新编码为 JPEG (质量 1-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if !(args.fps > 0.0) {
        bail!("fps must be positive");
    }
    let targets = resolve_targets(&args.targets)?;
    let files = collect_images(&args.input)?;
    if files.is_empty() {
        bail!("no images found in {}", args.input.display());
    }

    // 预先读入全部帧, 发送循环中不再访问磁盘
    let mut frames = Vec::with_capacity(files.len());
    for path in &files {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let bytes = match args.jpeg_quality {
            Some(quality) => reencode_jpeg(&bytes, quality)
                .with_context(|| format!("failed to re-encode {}", path.display()))?,
            None => bytes,
        };
        frames.push(bytes);
    }
    info!(frames = frames.len(), targets = targets.len(), fps = args.fps, "sender ready");

    let shutdown = ShutdownSignal::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || signal.raise()).context("failed to set Ctrl-C handler")?;

    let socket = UdpSocket::bind("0.0.0.0:0").context("failed to bind sender socket")?;
    let chunker = FrameChunker::new(args.chunk_size);
    let frame_interval = Duration::from_secs_f64(1.0 / args.fps);
    let mut meter = RateMeter::new(Duration::from_secs(2));
    let mut sent_total = 0u64;

    'outer: loop {
        for frame in &frames {
            if shutdown.is_raised() {
                break 'outer;
            }
            let started = Instant::now();
            match chunker.send_frame(&socket, &targets, frame) {
                Ok(_) => {
                    meter.record();
                    sent_total += 1;
                }
                Err(err) => warn!(error = %err, "send failed"),
            }
            if let Some(report) = meter.poll() {
                info!(fps = %format!("{:.1}", report.fps), sent = sent_total, "sender stats");
            }
            if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        if !args.repeat {
            break;
        }
    }

    info!(sent = sent_total, "sender stopped");
    Ok(())
}

fn resolve_targets(targets: &[String]) -> Result<Vec<SocketAddr>> {
    let mut out = Vec::with_capacity(targets.len());
    for target in targets {
        let addr = target
            .to_socket_addrs()
            .with_context(|| format!("invalid target {}", target))?
            .next()
            .with_context(|| format!("cannot resolve {}", target))?;
        out.push(addr);
    }
    Ok(out)
}

fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(input)
        .with_context(|| format!("failed to read {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out.into_inner())
}
