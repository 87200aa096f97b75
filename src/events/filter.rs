//! Per-kind event enable/disable set.
//!
//! [`EventFilter`] lets a consumer (typically [`LogWriter`](crate::LogWriter))
//! silence individual event kinds without unsubscribing. All kinds are enabled
//! by default.

use super::event::EventKind;

/// Which event kinds a consumer wants to see.
///
/// Plain boolean fields, one per [`EventKind`]; everything defaults to `true`.
///
/// # Example
/// ```
/// use tickwork::{EventFilter, EventKind};
///
/// let filter = EventFilter {
///     skipping_task: false,
///     ..EventFilter::default()
/// };
/// assert!(!filter.enabled(EventKind::SkippingTask));
/// assert!(filter.enabled(EventKind::TaskCompleted));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub worker_started: bool,
    pub worker_start_planned: bool,
    pub task_started: bool,
    pub task_completed: bool,
    pub task_completed_with_next: bool,
    pub worker_stopping: bool,
    pub worker_stopped: bool,
    pub caught_exception: bool,
    pub skipping_task: bool,
    pub worker_already_started: bool,
    pub worker_disposed: bool,
}

impl EventFilter {
    /// A filter with every kind disabled.
    pub fn silent() -> Self {
        Self {
            worker_started: false,
            worker_start_planned: false,
            task_started: false,
            task_completed: false,
            task_completed_with_next: false,
            worker_stopping: false,
            worker_stopped: false,
            caught_exception: false,
            skipping_task: false,
            worker_already_started: false,
            worker_disposed: false,
        }
    }

    /// Whether the given kind is enabled.
    pub fn enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::WorkerStarted => self.worker_started,
            EventKind::WorkerStartPlanned => self.worker_start_planned,
            EventKind::TaskStarted => self.task_started,
            EventKind::TaskCompleted => self.task_completed,
            EventKind::TaskCompletedWithNext => self.task_completed_with_next,
            EventKind::WorkerStopping => self.worker_stopping,
            EventKind::WorkerStopped => self.worker_stopped,
            EventKind::CaughtException => self.caught_exception,
            EventKind::SkippingTask => self.skipping_task,
            EventKind::WorkerAlreadyStarted => self.worker_already_started,
            EventKind::WorkerDisposed => self.worker_disposed,
        }
    }
}

impl Default for EventFilter {
    /// Everything enabled.
    fn default() -> Self {
        Self {
            worker_started: true,
            worker_start_planned: true,
            task_started: true,
            task_completed: true,
            task_completed_with_next: true,
            worker_stopping: true,
            worker_stopped: true,
            caught_exception: true,
            skipping_task: true,
            worker_already_started: true,
            worker_disposed: true,
        }
    }
}
