//! Permission watcher
//!
//! Re-reads OS permission grants while the permissions page is visible so
//! the page reflects changes the user makes in system settings.

use std::sync::Arc;
use std::time::Duration;

use super::collaborators::PermissionProbe;
use super::monitors::{EventSink, MonitorPayload};
use super::ticker::Ticker;
use super::types::{PermissionKind, PermissionSnapshot, PermissionStatus};

pub struct PermissionWatcher {
    probe: Arc<dyn PermissionProbe>,
    timeout: Duration,
}

impl PermissionWatcher {
    pub fn new(probe: Arc<dyn PermissionProbe>, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    /// Status of every kind. A read that fails or times out is recorded as
    /// undetermined.
    pub async fn poll(&self) -> PermissionSnapshot {
        let mut snapshot = PermissionSnapshot::new();
        for kind in PermissionKind::ALL {
            let status = match tokio::time::timeout(self.timeout, self.probe.status(kind)).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    tracing::warn!("Failed to read {} permission: {}", kind.label(), e);
                    PermissionStatus::Undetermined
                }
                Err(_) => {
                    tracing::debug!("{} permission read timed out", kind.label());
                    PermissionStatus::Undetermined
                }
            };
            snapshot.insert(kind, status);
        }
        snapshot
    }

    pub(super) async fn run(self, mut ticker: Box<dyn Ticker>, sink: EventSink) {
        loop {
            ticker.tick().await;
            let snapshot = self.poll().await;
            if !sink.send(MonitorPayload::Permissions(snapshot)) {
                break;
            }
        }
    }
}

/// True when every required kind is granted.
pub fn required_granted(snapshot: &PermissionSnapshot) -> bool {
    PermissionKind::ALL
        .iter()
        .filter(|k| k.is_required())
        .all(|k| snapshot.get(k) == Some(&PermissionStatus::Granted))
}

/// Guidance line for the permissions page.
pub fn guidance(snapshot: Option<&PermissionSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        return "Checking permissions...".to_string();
    };

    let denied: Vec<&str> = snapshot
        .iter()
        .filter(|(k, s)| k.is_required() && **s == PermissionStatus::Denied)
        .map(|(k, _)| k.label())
        .collect();
    if !denied.is_empty() {
        return format!(
            "Enable {} in System Settings, then come back here",
            denied.join(" and ")
        );
    }

    let missing: Vec<&str> = snapshot
        .iter()
        .filter(|(k, s)| k.is_required() && **s != PermissionStatus::Granted)
        .map(|(k, _)| k.label())
        .collect();
    if !missing.is_empty() {
        return format!("Grant {} to continue", missing.join(" and "));
    }

    "All required permissions granted".to_string()
}
