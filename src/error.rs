//! Error types used by the tickwork workers and tasks.
//!
//! Four enums cover the API surface:
//!
//! - [`TaskError`] — errors raised by individual task executions.
//! - [`StartError`] — reasons a worker refused to start.
//! - [`StopError`] — the single way a stop can fail (deadline exceeded).
//! - [`QueueError`] — cancellation/closure while waiting on a [`TaskQueue`](crate::TaskQueue).
//!
//! All provide `as_label` helpers (snake_case) for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by task execution.
///
/// A task body returns one of these to report how an execution ended.
/// The worker converts it into a [`TaskStatus`](crate::TaskStatus) and an event;
/// it never propagates out of the worker loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task execution exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Task observed the stop signal and exited early.
    #[error("context cancelled")]
    Canceled,

    /// Any other execution failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Wraps an arbitrary error message into [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickwork::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Canceled => "task_canceled",
            TaskError::Fail { .. } => "task_failed",
        }
    }
}

/// # Reasons a worker refused to start.
///
/// `start` never silently proceeds on a worker that is not in a startable
/// state; the caller always gets an explicit refusal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    /// The worker is already running (or currently stopping).
    #[error("worker has already started")]
    AlreadyStarted,

    /// The worker was stopped; a stopped worker is not restartable.
    /// Create a fresh instance instead.
    #[error("worker has stopped and cannot be restarted")]
    Stopped,

    /// The worker was disposed; no further operations are possible.
    #[error("worker is disposed")]
    Disposed,
}

impl StartError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartError::AlreadyStarted => "worker_already_started",
            StartError::Stopped => "worker_stopped",
            StartError::Disposed => "worker_disposed",
        }
    }
}

/// # The single failure mode of `stop`.
///
/// A stop never surfaces the in-flight task's own failure or cancellation.
/// The only error the caller can see is its own deadline firing before the
/// in-flight execution returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StopError {
    /// The caller-supplied stop deadline elapsed while the in-flight
    /// execution was still running.
    #[error("stop deadline exceeded while waiting for worker {worker:?}")]
    DeadlineExceeded {
        /// Name of the worker that did not drain in time.
        worker: String,
    },
}

/// # Errors surfaced by [`TaskQueue`](crate::TaskQueue) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The caller's signal was cancelled while waiting for a slot or an item.
    /// Nothing was enqueued/dequeued.
    #[error("queue operation cancelled")]
    Canceled,

    /// The queue was closed; no further items will flow through it.
    #[error("queue is closed")]
    Closed,
}
