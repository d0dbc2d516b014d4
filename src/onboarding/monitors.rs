//! Monitor lifecycle and result merging
//!
//! Each visible page arms the monitors it needs. Monitor tasks never touch
//! wizard state; they push tagged results into one channel and the
//! orchestrator applies them. A result is committed only if the handle that
//! produced it is still the live handle for its kind.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use super::auth::{ExchangeRequest, run_exchange};
use super::clipboard::ClipboardWatcher;
use super::collaborators::AuthGrant;
use super::peer::PeerProbeMonitor;
use super::permissions::PermissionWatcher;
use super::ticker::MonitorHandle;
use super::types::{
    AuthFlowState, ClipboardSnapshot, MonitorKind, PeerProbeResult, PermissionSnapshot, WizardPage,
};
use super::wizard::WizardOrchestrator;
use crate::error::CollaboratorError;

type MonitorTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What a monitor observed.
#[derive(Debug)]
pub enum MonitorPayload {
    Permissions(PermissionSnapshot),
    PeerProbe(Option<PeerProbeResult>),
    Clipboard(ClipboardSnapshot),
    AuthExchange(Result<AuthGrant, CollaboratorError>),
}

/// A payload tagged with the handle that produced it.
#[derive(Debug)]
pub struct MonitorEvent {
    pub kind: MonitorKind,
    pub generation: u64,
    pub payload: MonitorPayload,
}

/// Sending half given to one monitor task.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<MonitorEvent>,
    kind: MonitorKind,
    generation: u64,
}

impl EventSink {
    pub(super) fn new(
        tx: mpsc::UnboundedSender<MonitorEvent>,
        kind: MonitorKind,
        generation: u64,
    ) -> Self {
        Self {
            tx,
            kind,
            generation,
        }
    }

    /// Returns false once the orchestrator is gone.
    pub fn send(&self, payload: MonitorPayload) -> bool {
        self.tx
            .send(MonitorEvent {
                kind: self.kind,
                generation: self.generation,
                payload,
            })
            .is_ok()
    }
}

impl WizardOrchestrator {
    /// Monitors that should be live right now.
    pub(super) fn desired_monitors(&self) -> BTreeSet<MonitorKind> {
        let mut desired = BTreeSet::new();
        match self.visible {
            Some(WizardPage::Connection) => {
                desired.insert(MonitorKind::PeerProbe);
            }
            Some(WizardPage::Permissions) => {
                desired.insert(MonitorKind::Permissions);
            }
            Some(WizardPage::Auth) => {
                if self.auth.wants_clipboard() {
                    desired.insert(MonitorKind::Clipboard);
                }
                if self.auth.state() == AuthFlowState::Exchanging {
                    desired.insert(MonitorKind::AuthExchange);
                }
            }
            _ => {}
        }
        desired
    }

    /// Stop every live monitor that is no longer wanted, then start every
    /// wanted monitor that is not live. Safe to call any number of times.
    pub(super) fn reconcile_monitors(&mut self) {
        let desired = self.desired_monitors();

        self.monitors.retain(|kind, handle| {
            let keep = desired.contains(kind);
            if !keep {
                tracing::debug!("Stopping {:?} monitor #{}", kind, handle.generation());
            }
            keep
        });

        for kind in desired {
            if !self.monitors.contains_key(&kind) {
                self.start_monitor(kind);
            }
        }

        debug_assert!(
            self.monitors
                .keys()
                .all(|k| Some(k.page()) == self.visible),
            "monitor outlived its page"
        );
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn start_monitor(&mut self, kind: MonitorKind) {
        debug_assert!(
            !self.monitors.contains_key(&kind),
            "duplicate {:?} monitor",
            kind
        );
        let generation = self.bump_generation();
        let sink = EventSink::new(self.events_tx.clone(), kind, generation);
        let Some(task) = self.monitor_task(kind, sink) else {
            return;
        };
        tracing::debug!("Starting {:?} monitor #{}", kind, generation);
        self.monitors
            .insert(kind, MonitorHandle::spawn(kind, generation, task));
    }

    /// The polling loop for `kind`. The exchange is not a poller; it is
    /// launched by [`Self::start_exchange`] with the code it needs.
    fn monitor_task(&self, kind: MonitorKind, sink: EventSink) -> Option<MonitorTask> {
        let task: MonitorTask = match kind {
            MonitorKind::Permissions => {
                let watcher = PermissionWatcher::new(
                    self.collaborators.permissions.clone(),
                    self.config.permission_timeout(),
                );
                let ticker = self.clock.ticker(self.config.permission_poll());
                Box::pin(watcher.run(ticker, sink))
            }
            MonitorKind::PeerProbe => {
                let monitor = PeerProbeMonitor::new(
                    self.collaborators.discovery.clone(),
                    self.config.discovery_timeout(),
                );
                let ticker = self.clock.ticker(self.config.peer_poll());
                Box::pin(monitor.run(ticker, sink))
            }
            MonitorKind::Clipboard => {
                let watcher = ClipboardWatcher::new(
                    self.collaborators.clipboard.clone(),
                    self.matcher.clone(),
                    self.last_clipboard_change,
                );
                let ticker = self.clock.ticker(self.config.clipboard_poll());
                Box::pin(watcher.run(ticker, sink))
            }
            MonitorKind::AuthExchange => return None,
        };
        Some(task)
    }

    pub(super) fn start_exchange(&mut self, request: ExchangeRequest) {
        let kind = MonitorKind::AuthExchange;
        debug_assert!(!self.monitors.contains_key(&kind), "exchange already running");
        let generation = self.bump_generation();
        let sink = EventSink::new(self.events_tx.clone(), kind, generation);
        let task = run_exchange(
            self.collaborators.auth.clone(),
            request,
            self.config.exchange_timeout(),
            sink,
        );
        tracing::debug!("Starting authorization exchange #{}", generation);
        self.monitors
            .insert(kind, MonitorHandle::spawn(kind, generation, task));
    }

    /// Commit one monitor result. Returns false when the result was
    /// discarded: its handle is gone or was replaced, or it carries nothing
    /// new.
    pub(super) fn apply_event(&mut self, event: MonitorEvent) -> bool {
        let live = self.monitors.get(&event.kind).map(MonitorHandle::generation);
        if live != Some(event.generation) {
            tracing::trace!(
                "Discarding stale {:?} result #{} (live: {:?})",
                event.kind,
                event.generation,
                live
            );
            return false;
        }

        match event.payload {
            MonitorPayload::Permissions(snapshot) => {
                self.permissions = Some(snapshot);
            }
            MonitorPayload::PeerProbe(result) => {
                self.peer_probe = result;
            }
            MonitorPayload::Clipboard(snapshot) => {
                if snapshot.change_counter <= self.last_clipboard_change {
                    return false;
                }
                self.last_clipboard_change = snapshot.change_counter;
                if let Some(code) = snapshot.code
                    && let Some(request) = self.auth.on_clipboard_code(code)
                {
                    self.start_exchange(request);
                }
            }
            MonitorPayload::AuthExchange(result) => {
                self.monitors.remove(&MonitorKind::AuthExchange);
                self.auth.on_exchange_result(result);
            }
        }

        self.reconcile_monitors();
        true
    }

    /// Apply everything already queued without waiting. Returns how many
    /// results were committed.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next monitor result and apply it. Returns the kind that
    /// was committed, or `None` when the result was discarded.
    ///
    /// Never resolves while no monitor is live; hosts select on it alongside
    /// their own input.
    pub async fn next_event(&mut self) -> Option<MonitorKind> {
        let event = self.events_rx.recv().await?;
        let kind = event.kind;
        self.apply_event(event).then_some(kind)
    }

    /// Drop queued results without applying them.
    pub(super) fn drain_events(&mut self) -> usize {
        let mut dropped = 0;
        while self.events_rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    /// Number of results waiting in the channel.
    #[cfg(test)]
    pub(super) fn queued_events(&self) -> usize {
        self.events_rx.len()
    }

    #[cfg(test)]
    pub(super) fn monitor_generation(&self, kind: MonitorKind) -> Option<u64> {
        self.monitors.get(&kind).map(MonitorHandle::generation)
    }
}
