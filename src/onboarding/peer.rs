//! Peer probe
//!
//! On the connection page, periodically asks discovery whether the local
//! service the app expects is already running, so the page can say
//! "already connected" instead of walking the user through setup again.

use std::sync::Arc;
use std::time::Duration;

use super::collaborators::PeerDiscovery;
use super::monitors::{EventSink, MonitorPayload};
use super::ticker::Ticker;
use super::types::PeerProbeResult;

pub struct PeerProbeMonitor {
    discovery: Arc<dyn PeerDiscovery>,
    timeout: Duration,
}

impl PeerProbeMonitor {
    pub fn new(discovery: Arc<dyn PeerDiscovery>, timeout: Duration) -> Self {
        Self { discovery, timeout }
    }

    /// One discovery query, bounded by the configured timeout. Failures
    /// and timeouts read as "no peer".
    pub async fn poll(&self) -> Option<PeerProbeResult> {
        match tokio::time::timeout(self.timeout, self.discovery.find_expected_peer()).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Peer discovery failed: {}", e);
                None
            }
            Err(_) => {
                tracing::debug!("Peer discovery timed out after {:?}", self.timeout);
                None
            }
        }
    }

    pub(super) async fn run(self, mut ticker: Box<dyn Ticker>, sink: EventSink) {
        loop {
            ticker.tick().await;
            let result = self.poll().await;
            if let Some(ref peer) = result {
                tracing::debug!(
                    "Peer on port {} (pid {}) expected={}",
                    peer.port,
                    peer.pid,
                    peer.matches_expected
                );
            }
            if !sink.send(MonitorPayload::PeerProbe(result)) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::test_helpers::helpers::{MockDiscovery, sample_peer};

    #[tokio::test]
    async fn test_poll_returns_discovered_peer() {
        let discovery = Arc::new(MockDiscovery::returning(Some(sample_peer())));
        let monitor = PeerProbeMonitor::new(discovery.clone(), Duration::from_secs(1));
        assert_eq!(monitor.poll().await, Some(sample_peer()));
        assert_eq!(discovery.calls(), 1);
    }

    #[tokio::test]
    async fn test_poll_error_reads_as_absent() {
        let discovery = Arc::new(MockDiscovery::failing());
        let monitor = PeerProbeMonitor::new(discovery, Duration::from_secs(1));
        assert_eq!(monitor.poll().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stalled_call_times_out() {
        let discovery = Arc::new(MockDiscovery::stalled());
        let monitor = PeerProbeMonitor::new(discovery, Duration::from_millis(500));
        assert_eq!(monitor.poll().await, None);
    }
}
