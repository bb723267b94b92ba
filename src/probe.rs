//! TCP reachability probing.
//!
//! A probe is a cheap pre-filter before any authenticated session is
//! attempted: one bounded TCP connect, then the socket is dropped.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::debug;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Bounded TCP connect-test against one device and port.
#[derive(Debug, Clone, Copy)]
pub struct ReachabilityProbe {
    /// Port to probe, normally the SSH port.
    pub port: u16,

    /// Hard per-probe timeout.
    pub timeout: Duration,
}

impl ReachabilityProbe {
    /// Create a probe for the given port and timeout.
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Probe one address.
    ///
    /// Returns `true` only when a connection establishes within the
    /// timeout. Refused, timed out and every other socket-level failure
    /// all map to `false`; nothing escapes this boundary. The socket is
    /// closed immediately on success. No retry happens here — re-probing
    /// is the caller's decision.
    pub async fn probe(&self, addr: IpAddr) -> bool {
        let target = SocketAddr::new(addr, self.port);

        match timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!("Probe {} failed: {}", target, e);
                false
            }
            Err(_elapsed) => {
                debug!("Probe {} timed out after {:?}", target, self.timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = ReachabilityProbe::new(port, Duration::from_secs(2));
        assert!(probe.probe("127.0.0.1".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn test_probe_closed_port_is_unreachable() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = ReachabilityProbe::new(port, Duration::from_secs(2));
        assert!(!probe.probe("127.0.0.1".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn test_probe_timeout_is_bounded() {
        // RFC 5737 TEST-NET-1, traffic to it blackholes.
        let probe = ReachabilityProbe::new(22, Duration::from_millis(200));
        let start = Instant::now();
        let reachable = probe.probe("192.0.2.1".parse().unwrap()).await;
        assert!(!reachable);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
