//! Cancellable periodic tasks
//!
//! Monitors are tokio tasks driven by a [`Ticker`] obtained from an injected
//! [`Clock`]. Production uses [`TokioClock`]; tests use [`ManualClock`] so
//! every poll happens exactly when the test says so.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::types::MonitorKind;

/// Source of poll triggers for one monitor.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next trigger.
    async fn tick(&mut self);
}

/// Hands out tickers. Injected into the orchestrator.
pub trait Clock: Send + Sync {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

/// Wall-clock ticks via `tokio::time::interval`.
///
/// The first tick fires immediately so a page shows fresh state as soon as
/// it is entered. Ticks missed behind a slow poll are skipped, not bunched.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

struct IntervalTicker(tokio::time::Interval);

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.0.tick().await;
    }
}

impl Clock for TokioClock {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Box::new(IntervalTicker(interval))
    }
}

/// Test clock: every live ticker fires once per [`ManualClock::tick`],
/// regardless of its period.
#[derive(Debug, Clone)]
pub struct ManualClock {
    tx: broadcast::Sender<()>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Fire all tickers. Returns how many tickers were subscribed.
    pub fn tick(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

struct ManualTicker(broadcast::Receiver<()>);

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        match self.0.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            // Clock dropped: no more ticks, ever
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

impl Clock for ManualClock {
    fn ticker(&self, _period: Duration) -> Box<dyn Ticker> {
        Box::new(ManualTicker(self.tx.subscribe()))
    }
}

/// Owns one running monitor task.
///
/// Dropping the handle cancels the token and aborts the task, so a stalled
/// collaborator call is abandoned rather than leaked.
#[derive(Debug)]
pub struct MonitorHandle {
    kind: MonitorKind,
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Spawn `fut` on the current runtime, racing it against cancellation.
    pub fn spawn<F>(kind: MonitorKind, generation: u64, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::trace!("{:?} monitor #{} cancelled", kind, generation);
                }
                _ = fut => {}
            }
        });
        Self {
            kind,
            generation,
            token,
            task,
        }
    }

    pub fn kind(&self) -> MonitorKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the task has run to completion (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}
