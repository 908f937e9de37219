use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use super::resolve_addr;
use crate::error::{LaneError, SendError};

/// 关键点结果发送端
///
/// 绑定到临时端口 (`0.0.0.0:0`), 每帧一次 `send_to`, 失败不重试。
#[derive(Debug)]
pub struct ResultSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl ResultSender {
    /// 解析 `host:port` 并绑定与目标地址族一致的临时端口
    pub fn bind(host: &str, port: u16) -> Result<Self, LaneError> {
        let target = resolve_addr(host, port)?;

        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).map_err(|source| LaneError::Bind {
            addr: local,
            source,
        })?;

        Ok(Self { socket, target })
    }

    /// 发送一个数据报
    pub fn send(&self, payload: &[u8]) -> Result<(), SendError> {
        match self.socket.send_to(payload, self.target) {
            Ok(sent) if sent == payload.len() => Ok(()),
            Ok(sent) => Err(SendError::Truncated {
                target: self.target,
                sent,
                len: payload.len(),
            }),
            Err(source) => Err(SendError::Io {
                target: self.target,
                len: payload.len(),
                source,
            }),
        }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_send_reaches_target() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let sender = ResultSender::bind("127.0.0.1", port).unwrap();
        assert_eq!(sender.target().port(), port);
        sender.send(b"0|0.000000|0.000000|0.000000\n").unwrap();

        let mut buf = [0u8; 128];
        let (n, from) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"0|0.000000|0.000000|0.000000\n");
        assert_eq!(Some(from.port()), sender.local_addr().map(|a| a.port()));
    }

    #[test]
    fn test_unresolvable_host() {
        let err = ResultSender::bind("definitely-not-a-host.invalid", 9).unwrap_err();
        assert!(matches!(err, LaneError::Resolve { port: 9, .. }));
    }
}
