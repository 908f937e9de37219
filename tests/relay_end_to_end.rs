//! 端到端测试: 真实的本地 UDP 套接字, 桩解码器 + 固定姿态

use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use image::RgbImage;

use pose_relay::{
    FrameDecoder, LandmarkSet, LaneSpec, LaneSupervisor, PoseOracle, ProcessorExit, ReceiverExit,
    RelayConfig, StaticPoseOracle, FRAME_END, FRAME_START, LANDMARK_COUNT,
};

/// 记录收到的编码帧, 返回固定大小的空白图像
struct RecordingDecoder {
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FrameDecoder for RecordingDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<RgbImage> {
        self.seen.lock().unwrap().push(bytes.to_vec());
        Ok(RgbImage::new(320, 240))
    }
}

struct FailingOracle;

impl PoseOracle for FailingOracle {
    fn estimate(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>> {
        bail!("inference backend unavailable")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct Relay {
    supervisor: LaneSupervisor,
    lanes: Vec<LaneSpec>,
    outputs: Vec<UdpSocket>,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

/// 启动 `lane_count` 条通道, 每条通道的输出端口上都有一个监听套接字
///
/// 输出端口先由系统分配, 输入端口取输出端口 - 1; 端口被占用时换一组重试。
fn start_relay(
    lane_count: usize,
    max_failures: u32,
    oracle_for: fn(usize) -> Box<dyn PoseOracle>,
) -> Relay {
    for _ in 0..20 {
        let outputs: Vec<UdpSocket> = (0..lane_count)
            .map(|_| UdpSocket::bind("127.0.0.1:0").unwrap())
            .collect();
        for socket in &outputs {
            socket
                .set_read_timeout(Some(Duration::from_secs(3)))
                .unwrap();
        }
        let input_ports: Vec<u16> = outputs
            .iter()
            .map(|s| s.local_addr().unwrap().port() - 1)
            .collect();

        let config = RelayConfig {
            input_ports: input_ports.clone(),
            output_port_offset: 1,
            bind_host: "127.0.0.1".to_string(),
            output_host: "127.0.0.1".to_string(),
            read_timeout_ms: 20,
            max_consecutive_failures: max_failures,
            ..RelayConfig::default()
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let decoder_seen = Arc::clone(&seen);
        let supervisor = LaneSupervisor::start_with(
            &config,
            |lane: &LaneSpec| {
                let index = input_ports
                    .iter()
                    .position(|&p| p == lane.input_port)
                    .unwrap();
                Ok(oracle_for(index))
            },
            move |_: &LaneSpec| {
                Box::new(RecordingDecoder {
                    seen: Arc::clone(&decoder_seen),
                }) as Box<dyn FrameDecoder>
            },
        );

        if supervisor.failed_lanes().is_empty() {
            return Relay {
                lanes: config.lanes(),
                supervisor,
                outputs,
                seen,
            };
        }
        supervisor.shutdown();
    }
    panic!("could not find free port pairs for {} lanes", lane_count);
}

fn send_frame(lane: &LaneSpec, chunks: &[&[u8]]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let to = ("127.0.0.1", lane.input_port);
    socket.send_to(FRAME_START, to).unwrap();
    for chunk in chunks {
        socket.send_to(chunk, to).unwrap();
    }
    socket.send_to(FRAME_END, to).unwrap();
}

fn static_oracle(_: usize) -> Box<dyn PoseOracle> {
    Box::new(StaticPoseOracle::neutral())
}

#[test]
fn test_fake_frame_produces_one_landmark_datagram() {
    let relay = start_relay(1, 100, static_oracle);
    let lane = relay.lanes[0];

    let frame: &[u8] = b"0123456789";
    send_frame(&lane, &[&frame[..4], &frame[4..7], &frame[7..]]);

    let mut buf = [0u8; 4096];
    let len = relay.outputs[0].recv(&mut buf).unwrap();
    let text = std::str::from_utf8(&buf[..len]).unwrap();

    assert!(text.ends_with('\n'));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), LANDMARK_COUNT);
    for (i, line) in lines.iter().enumerate() {
        let fields: Vec<&str> = line.split('|').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], i.to_string());
        for value in &fields[1..] {
            // 固定 6 位小数
            let decimals = value.split('.').nth(1).unwrap();
            assert_eq!(decimals.len(), 6);
        }
    }

    let expected = StaticPoseOracle::neutral().pose().to_wire();
    assert_eq!(text, expected);
    assert_eq!(*relay.seen.lock().unwrap(), vec![frame.to_vec()]);

    // 第二帧: 每帧恰好一个数据报
    send_frame(&lane, &[frame]);
    let len = relay.outputs[0].recv(&mut buf).unwrap();
    assert_eq!(LandmarkSet::parse_wire(&buf[..len]).unwrap().to_wire(), expected);

    relay.outputs[0]
        .set_read_timeout(Some(Duration::from_millis(150)))
        .unwrap();
    assert!(relay.outputs[0].recv(&mut buf).is_err());

    let reports = relay.supervisor.shutdown();
    assert_eq!(reports[0].receiver, Some(ReceiverExit::Shutdown));
    assert_eq!(reports[0].processor, Some(ProcessorExit::Shutdown));
}

#[test]
fn test_failed_lane_does_not_affect_other_lanes() {
    fn oracle_for(index: usize) -> Box<dyn PoseOracle> {
        if index == 0 {
            Box::new(FailingOracle)
        } else {
            Box::new(StaticPoseOracle::neutral())
        }
    }
    let relay = start_relay(2, 3, oracle_for);
    let (broken, healthy) = (relay.lanes[0], relay.lanes[1]);

    // 持续向故障通道发帧, 直到处理线程达到失败上限、接收线程随之退出
    let deadline = Instant::now() + Duration::from_secs(5);
    while relay.supervisor.running_lanes().contains(&broken) {
        assert!(Instant::now() < deadline, "broken lane never stopped");
        send_frame(&broken, &[b"frame"]);
        thread::sleep(Duration::from_millis(20));
    }

    // 健康通道不受影响
    send_frame(&healthy, &[b"fake", b"jpeg"]);
    let mut buf = [0u8; 4096];
    let len = relay.outputs[1].recv(&mut buf).unwrap();
    let pose = LandmarkSet::parse_wire(&buf[..len]).unwrap();
    assert_eq!(pose.points().len(), LANDMARK_COUNT);
    assert_eq!(relay.supervisor.running_lanes(), vec![healthy]);

    // 故障通道没有任何输出
    relay.outputs[0]
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    assert!(relay.outputs[0].recv(&mut buf).is_err());

    let reports = relay.supervisor.shutdown();
    assert_eq!(reports.len(), 2);
    assert_eq!(
        reports[0].processor,
        Some(ProcessorExit::FailureCeiling { failures: 3 })
    );
    assert_eq!(reports[0].receiver, Some(ReceiverExit::QueueClosed));
    assert_eq!(reports[1].processor, Some(ProcessorExit::Shutdown));
    assert_eq!(reports[1].receiver, Some(ReceiverExit::Shutdown));
}
