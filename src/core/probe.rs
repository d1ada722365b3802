//! Reachability probing for proxy endpoints.
//!
//! A probe is a bare TCP connect with a hard timeout. It is a coarse
//! liveness signal only; it says nothing about MTProto protocol health.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::domain::ProxyLink;

/// Default per-probe connect timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of a single reachability probe.
///
/// Faults are carried as data, not errors: a probe never propagates a
/// transport failure to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A TCP connection to the endpoint was established.
    Reachable,

    /// The endpoint refused, timed out, or failed to resolve.
    Unreachable(String),

    /// The link does not encode a usable (host, port) pair;
    /// no connection was attempted.
    Malformed,
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

/// Trait for reachability probers (mockable in tests)
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, link: &ProxyLink) -> ProbeOutcome;
}

/// TCP connect-only prober
pub struct TcpProber {
    connect_timeout: Duration,
}

impl TcpProber {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, link: &ProxyLink) -> ProbeOutcome {
        let Some((host, port)) = link.endpoint() else {
            return ProbeOutcome::Malformed;
        };

        match timeout(
            self.connect_timeout,
            TcpStream::connect((host.as_str(), port)),
        )
        .await
        {
            Ok(Ok(_stream)) => ProbeOutcome::Reachable,
            Ok(Err(e)) => ProbeOutcome::Unreachable(e.to_string()),
            Err(_) => ProbeOutcome::Unreachable(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_malformed_link_skips_connection() {
        let prober = TcpProber::default();
        let outcome = prober
            .probe(&ProxyLink::new("tg://proxy?secret=aa"))
            .await;
        assert_eq!(outcome, ProbeOutcome::Malformed);
    }

    #[tokio::test]
    async fn test_open_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let link = ProxyLink::new(format!(
            "tg://proxy?server=127.0.0.1&port={}&secret=dd00112233445566778899aabbccddee",
            port
        ));

        let prober = TcpProber::default();
        assert!(prober.probe(&link).await.is_reachable());
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        // Bind then drop to get a port that is very likely closed
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let link = ProxyLink::new(format!(
            "tg://proxy?server=127.0.0.1&port={}&secret=dd00112233445566778899aabbccddee",
            port
        ));

        let prober = TcpProber::default();
        match prober.probe(&link).await {
            ProbeOutcome::Unreachable(reason) => assert!(!reason.is_empty()),
            other => panic!("expected Unreachable, got {:?}", other),
        }
    }
}
