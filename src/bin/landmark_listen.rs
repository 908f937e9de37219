/// 关键点监听 - 模拟下游渲染端, 绑定输出端口并打印收到的姿态
///
/// 运行: cargo run --bin landmark-listen -- --port 52733
use std::net::UdpSocket;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use pose_relay::logging::init_logging;
use pose_relay::stats::RateMeter;
use pose_relay::transport::MAX_DATAGRAM_SIZE;
use pose_relay::{LandmarkSet, ShutdownSignal};

#[derive(Parser, Debug)]
#[command(author, version, about = "监听姿态中继的关键点输出", long_about = None)]
struct Args {
    /// 绑定地址
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// 输出端口 (输入端口 + 偏移)
    #[arg(short, long, default_value_t = 52733)]
    port: u16,

    /// 打印的关键点索引, 逗号分隔
    #[arg(long, value_delimiter = ',', default_values_t = [0usize, 11, 12, 23, 24])]
    show: Vec<usize>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let socket = UdpSocket::bind((args.host.as_str(), args.port))
        .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
    socket.set_read_timeout(Some(Duration::from_millis(100)))?;
    info!(addr = %socket.local_addr()?, "listening for landmarks");

    let shutdown = ShutdownSignal::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || signal.raise()).context("failed to set Ctrl-C handler")?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut meter = RateMeter::new(Duration::from_secs(1));
    let mut received = 0u64;

    while !shutdown.is_raised() {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(_) => continue,
        };
        received += 1;
        meter.record();

        match LandmarkSet::parse_wire(&buf[..len]) {
            Ok(pose) => {
                for &index in &args.show {
                    if let Some(p) = pose.points().get(index) {
                        debug!(index, x = p.x, y = p.y, z = p.z, "landmark");
                    }
                }
                if let Some(report) = meter.poll() {
                    let nose = pose[0];
                    info!(
                        %from,
                        fps = %format!("{:.1}", report.fps),
                        nose = %format!("({:.3}, {:.3}, {:.3})", nose.x, nose.y, nose.z),
                        "pose stream"
                    );
                }
            }
            Err(err) => warn!(%from, error = %err, "malformed landmark datagram"),
        }
    }

    info!(received, "listener stopped");
    Ok(())
}
