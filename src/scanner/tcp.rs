//! TCP connect prober.
//!
//! Classifies a port with a single full TCP connect through the operating
//! system's socket API. No elevated privileges are needed and no connection
//! is ever reused or retried.

use crate::scanner::traits::{PortProber, PortStatus};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Probes ports with `connect()` bounded by a deadline.
///
/// - handshake completes in time: [`PortStatus::Open`]
/// - connection refused or reset: [`PortStatus::Closed`]
/// - deadline elapses or any other error: [`PortStatus::Unknown`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectProber;

impl TcpConnectProber {
    /// Create a new TCP connect prober.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortProber for TcpConnectProber {
    async fn probe(&self, addr: SocketAddr, deadline: Duration) -> PortStatus {
        match timeout(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => {
                if let Err(e) = stream.shutdown().await {
                    trace!(%addr, error = %e, "shutdown after connect failed");
                }
                PortStatus::Open
            }
            Ok(Err(e)) => {
                let status = classify_connect_error(&e);
                trace!(%addr, error = %e, %status, "connect failed");
                status
            }
            Err(_) => PortStatus::Unknown,
        }
    }
}

/// Map a failed connect onto a port status.
fn classify_connect_error(err: &io::Error) -> PortStatus {
    match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => PortStatus::Closed,
        _ => PortStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    #[test]
    fn test_classify_connect_error() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        let other = io::Error::new(io::ErrorKind::Other, "no route to host");

        assert_eq!(classify_connect_error(&refused), PortStatus::Closed);
        assert_eq!(classify_connect_error(&reset), PortStatus::Closed);
        assert_eq!(classify_connect_error(&other), PortStatus::Unknown);
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let status = TcpConnectProber::new()
            .probe(addr, Duration::from_millis(500))
            .await;
        assert_eq!(status, PortStatus::Open);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        // Bind then release a port so nothing listens on it.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let status = TcpConnectProber::new()
            .probe(addr, Duration::from_millis(500))
            .await;
        assert_eq!(status, PortStatus::Closed);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_probe_deadline_elapsed_is_unknown() {
        use tokio::net::TcpSocket;

        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(0).unwrap();
        let addr = listener.local_addr().unwrap();

        // Fill the accept queue; nothing is ever accepted, so further SYNs
        // are dropped and the handshake never completes.
        let mut held = Vec::new();
        for _ in 0..16 {
            match timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => held.push(stream),
                _ => break,
            }
        }
        assert!(!held.is_empty());

        let status = TcpConnectProber::new()
            .probe(addr, Duration::from_millis(200))
            .await;
        assert_eq!(status, PortStatus::Unknown);
    }

    #[tokio::test]
    async fn test_probe_unroutable_address_is_not_open() {
        // TEST-NET-1 is never routed. Depending on the host this times out,
        // fails as unreachable, or gets rejected by a local firewall.
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 81);

        let status = TcpConnectProber::new()
            .probe(addr, Duration::from_millis(100))
            .await;
        assert_ne!(status, PortStatus::Open);
    }
}
