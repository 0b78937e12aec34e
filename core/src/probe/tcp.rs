use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{ConnectError, Connector};

/// Plain TCP handshake against the real network.
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr, probe_timeout: Duration) -> Result<Duration, ConnectError> {
        let start = Instant::now();
        match timeout(probe_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                let elapsed = start.elapsed();
                drop(stream);
                Ok(elapsed)
            }
            Ok(Err(err)) => Err(classify(&err)),
            Err(_elapsed) => Err(ConnectError::Timeout),
        }
    }
}

fn classify(err: &io::Error) -> ConnectError {
    match err.kind() {
        io::ErrorKind::TimedOut => ConnectError::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable => ConnectError::Unreachable(err.to_string()),
        _ => ConnectError::Other(err.to_string()),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_to_loopback_listener_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let result = TcpConnector.connect(addr, Duration::from_secs(2)).await;

        assert!(result.is_ok(), "expected handshake, got {result:?}");
    }

    #[tokio::test]
    async fn closed_loopback_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpConnector.connect(addr, Duration::from_secs(2)).await;

        assert!(matches!(result, Err(ConnectError::Unreachable(_))), "got {result:?}");
    }

    #[tokio::test]
    #[ignore]
    async fn blackholed_address_times_out() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1)), 443);
        let result = TcpConnector.connect(addr, Duration::from_millis(200)).await;
        assert_eq!(result, Err(ConnectError::Timeout));
    }
}
