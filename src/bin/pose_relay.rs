/// 多通道姿态中继 - UDP分片帧 → 姿态估计 → 平滑 → UDP关键点文本
///
/// 主程序入口 - 直接运行: cargo run --bin pose-relay --release
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{error, info};

use pose_relay::logging::init_logging;
use pose_relay::{Args, LaneSpec, PoseOracle, ProcessorExit, StaticPoseOracle};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // 配置错误直接退出, 不启动任何通道
    let config = args.resolve().context("invalid relay configuration")?;
    config.log_summary();

    // 所有通道共用同一份固定姿态
    let pose = match &args.pose_file {
        Some(path) => StaticPoseOracle::from_file(path)?,
        None => StaticPoseOracle::neutral(),
    };

    let supervisor = pose_relay::LaneSupervisor::start(&config, |_: &LaneSpec| {
        Ok(Box::new(pose.clone()) as Box<dyn PoseOracle>)
    });
    if supervisor.started_lanes().is_empty() {
        bail!("no lane could be started");
    }
    for lane in supervisor.started_lanes() {
        info!(
            "📡 {} → {}:{}",
            lane.input_port, config.output_host, lane.output_port
        );
    }

    let signal = supervisor.shutdown_signal();
    ctrlc::set_handler(move || signal.raise()).context("failed to set Ctrl-C handler")?;
    info!("relay running, press Ctrl-C to stop");

    supervisor.wait(Duration::from_millis(200));

    for report in supervisor.shutdown() {
        match report.processor {
            Some(ProcessorExit::FailureCeiling { failures }) => error!(
                input = report.lane.input_port,
                failures, "lane stopped after repeated failures"
            ),
            Some(exit) => info!(input = report.lane.input_port, ?exit, "lane stopped"),
            None => {}
        }
    }
    info!("relay stopped");
    Ok(())
}
