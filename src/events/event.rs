//! # Runtime events emitted by the workers.
//!
//! [`EventKind`] classifies worker lifecycle and per-execution events; the
//! [`Event`] struct carries the payload fields (worker name, task id, status,
//! elapsed time, next scheduled fire).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickwork::{Event, EventKind, TaskStatus};
//!
//! let ev = Event::new(EventKind::TaskCompleted, "mail-worker")
//!     .with_task_id("@T-1-0")
//!     .with_status(TaskStatus::Success)
//!     .with_elapsed(Duration::from_millis(42));
//!
//! assert_eq!(ev.kind, EventKind::TaskCompleted);
//! assert_eq!(ev.elapsed_ms, Some(42));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::status::TaskStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of worker events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// Queue worker started its consumer loop.
    ///
    /// Sets: `worker`, `at`, `seq`.
    WorkerStarted,

    /// Timed worker scheduled its first firing.
    ///
    /// Sets: `worker`, `next_at` (first fire), `period_ms`, `at`, `seq`.
    WorkerStartPlanned,

    /// Worker began its stop sequence.
    ///
    /// Sets: `worker`, `at`, `seq`.
    WorkerStopping,

    /// Worker finished stopping (in-flight execution drained or deadline hit).
    ///
    /// Sets: `worker`, `at`, `seq`.
    WorkerStopped,

    // === Per-execution ===
    /// One execution started.
    ///
    /// Sets: `worker`, `task_id`, `at`, `seq`.
    TaskStarted,

    /// One queue execution completed (any status).
    ///
    /// Sets: `worker`, `task_id`, `status`, `elapsed_ms`, `at`, `seq`.
    TaskCompleted,

    /// One scheduler firing completed (any status), with the provisional
    /// next fire time computed when the firing began.
    ///
    /// Sets: `worker`, `task_id`, `status`, `elapsed_ms`, `next_at`, `at`, `seq`.
    TaskCompletedWithNext,

    /// An execution ended with an error; the error was caught at the loop
    /// boundary and converted to a status.
    ///
    /// Sets: `worker`, `task_id`, `reason`, `at`, `seq`.
    CaughtException,

    /// A scheduler firing was skipped because the previous execution is
    /// still running.
    ///
    /// Sets: `worker`, `at`, `seq`.
    SkippingTask,

    // === Refusals ===
    /// `start` was called on a worker that is already running or stopped.
    ///
    /// Sets: `worker`, `reason`, `at`, `seq`.
    WorkerAlreadyStarted,

    /// `start`/`stop` was called on a disposed worker.
    ///
    /// Sets: `worker`, `at`, `seq`.
    WorkerDisposed,
}

/// Worker event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the worker that emitted the event.
    pub worker: Arc<str>,

    /// Unique id of the execution, if applicable.
    pub task_id: Option<Arc<str>>,
    /// Completion status of the execution.
    pub status: Option<TaskStatus>,
    /// Execution duration in milliseconds (compact).
    pub elapsed_ms: Option<u64>,
    /// Next scheduled fire time, if known.
    pub next_at: Option<SystemTime>,
    /// Timer period in milliseconds (compact).
    pub period_ms: Option<u64>,
    /// Human-readable reason (errors, refusal details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind, worker: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: worker.into(),
            task_id: None,
            status: None,
            elapsed_ms: None,
            next_at: None,
            period_ms: None,
            reason: None,
        }
    }

    /// Attaches an execution id.
    #[inline]
    pub fn with_task_id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    /// Attaches a completion status.
    #[inline]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches an execution duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches the next scheduled fire time.
    #[inline]
    pub fn with_next_at(mut self, at: SystemTime) -> Self {
        self.next_at = Some(at);
        self
    }

    /// Attaches a timer period (stored as milliseconds).
    #[inline]
    pub fn with_period(mut self, d: Duration) -> Self {
        self.period_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarted, "w");
        let b = Event::new(EventKind::WorkerStopped, "w");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::new(EventKind::TaskCompletedWithNext, "timed")
            .with_task_id("@T-1-0")
            .with_status(TaskStatus::Failed)
            .with_elapsed(Duration::from_millis(1500))
            .with_reason("boom");

        assert_eq!(ev.worker.as_ref(), "timed");
        assert_eq!(ev.task_id.as_deref(), Some("@T-1-0"));
        assert_eq!(ev.status, Some(TaskStatus::Failed));
        assert_eq!(ev.elapsed_ms, Some(1500));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}
