//! # ExecScope: cancellation/timeout composition for one execution.
//!
//! Every execution — a dequeued task or a scheduler firing — runs under a
//! scope combining the worker's stop signal with an optional per-execution
//! timeout:
//!
//! ```text
//!   stop token ──child──► task ctx ◄── cancelled on timeout
//!                            │
//!                       task.run(ctx)
//!                            │
//!              Success / Canceled / TimedOut / Failed + elapsed
//! ```
//!
//! - If a timeout is configured, the run is wrapped in [`tokio::time::timeout`];
//!   on elapse the child token is cancelled so the task observes it, and the
//!   outcome is [`TaskStatus::TimedOut`].
//! - [`TaskError::Canceled`] maps to [`TaskStatus::Canceled`] (stop-induced).
//! - Any other error maps to [`TaskStatus::Failed`] with the error preserved.
//!
//! The scope owns no lock; callers hold the single-flight permit around
//! `execute`, and RAII guarantees its release on every exit path.

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::status::TaskStatus;
use crate::tasks::Task;

/// Result of one guarded execution.
#[derive(Debug)]
pub(crate) struct ExecOutcome {
    pub status: TaskStatus,
    pub elapsed: Duration,
    /// The error behind `Failed`/`TimedOut`/`Canceled`, for the exception event.
    pub error: Option<TaskError>,
}

/// Combined cancellation scope: stop signal AND optional execution timeout.
#[derive(Debug, Clone)]
pub(crate) struct ExecScope {
    stop: CancellationToken,
    timeout: Option<Duration>,
}

impl ExecScope {
    pub(crate) fn new(stop: CancellationToken, timeout: Option<Duration>) -> Self {
        Self { stop, timeout }
    }

    /// Drives one execution of `task` under this scope and classifies the
    /// outcome. Never returns an error: task failures are converted to a
    /// status, upholding the worker loop's durability.
    pub(crate) async fn execute(&self, task: &dyn Task) -> ExecOutcome {
        let ctx = self.stop.child_token();
        let start = Instant::now();

        let result = match self.timeout.filter(|d| *d > Duration::ZERO) {
            Some(limit) => match time::timeout(limit, task.run(ctx.clone())).await {
                Ok(inner) => inner,
                Err(_elapsed) => {
                    ctx.cancel();
                    return ExecOutcome {
                        status: TaskStatus::TimedOut,
                        elapsed: start.elapsed(),
                        error: Some(TaskError::Timeout { timeout: limit }),
                    };
                }
            },
            None => task.run(ctx.clone()).await,
        };

        let elapsed = start.elapsed();
        match result {
            Ok(()) => ExecOutcome {
                status: TaskStatus::Success,
                elapsed,
                error: None,
            },
            Err(TaskError::Canceled) => ExecOutcome {
                status: TaskStatus::Canceled,
                elapsed,
                error: Some(TaskError::Canceled),
            },
            Err(err @ TaskError::Timeout { .. }) => ExecOutcome {
                status: TaskStatus::TimedOut,
                elapsed,
                error: Some(err),
            },
            Err(err) => ExecOutcome {
                status: TaskStatus::Failed,
                elapsed,
                error: Some(err),
            },
        }
    }
}
