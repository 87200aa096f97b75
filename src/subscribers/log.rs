//! # LogWriter — tracing-backed event writer
//!
//! A built-in subscriber that renders worker events as `tracing` records.
//! Individual event kinds can be silenced through an
//! [`EventFilter`](crate::EventFilter).
//!
//! ## Example output (with a fmt subscriber installed)
//! ```text
//! INFO worker="mailer" next_at=... period_ms=10000 worker start planned
//! INFO worker="mailer" task_id="@T-1700000000000-0" task started
//! INFO worker="mailer" task_id="@T-1700000000000-0" status="success" elapsed_ms=42 task completed
//! INFO worker="mailer" skipping task execution: previous task still running
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventFilter, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Debug, Default)]
pub struct LogWriter {
    filter: EventFilter,
}

impl LogWriter {
    /// Construct a writer that logs every event kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a writer with a custom per-kind filter.
    #[must_use]
    pub fn with_filter(filter: EventFilter) -> Self {
        Self { filter }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        if !self.filter.enabled(e.kind) {
            return;
        }
        let worker = e.worker.as_ref();
        match e.kind {
            EventKind::WorkerStarted => {
                info!(worker, "worker started");
            }
            EventKind::WorkerStartPlanned => {
                info!(worker, next_at = ?e.next_at, period_ms = e.period_ms, "worker start planned");
            }
            EventKind::TaskStarted => {
                info!(worker, task_id = e.task_id.as_deref(), "task started");
            }
            EventKind::TaskCompleted => {
                info!(
                    worker,
                    task_id = e.task_id.as_deref(),
                    status = e.status.map(|s| s.as_label()),
                    elapsed_ms = e.elapsed_ms,
                    "task completed"
                );
            }
            EventKind::TaskCompletedWithNext => {
                info!(
                    worker,
                    task_id = e.task_id.as_deref(),
                    status = e.status.map(|s| s.as_label()),
                    elapsed_ms = e.elapsed_ms,
                    next_at = ?e.next_at,
                    "task completed"
                );
            }
            EventKind::WorkerStopping => {
                info!(worker, "worker stopping");
            }
            EventKind::WorkerStopped => {
                info!(worker, "worker stopped");
            }
            EventKind::CaughtException => {
                error!(
                    worker,
                    task_id = e.task_id.as_deref(),
                    reason = e.reason.as_deref(),
                    "caught an exception while executing the task"
                );
            }
            EventKind::SkippingTask => {
                info!(
                    worker,
                    "skipping task execution: previous task still running"
                );
            }
            EventKind::WorkerAlreadyStarted => {
                warn!(worker, reason = e.reason.as_deref(), "worker has already started");
            }
            EventKind::WorkerDisposed => {
                warn!(worker, "worker is disposed");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
