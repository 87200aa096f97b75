//! # Task abstraction.
//!
//! This module defines the [`Task`] trait (async, cancelable). The common
//! handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for sharing between
//! producers, queues, and workers.
//!
//! A task receives a [`CancellationToken`] and should periodically check it to
//! stop cooperatively during shutdown or on a per-execution timeout. The core
//! never inspects a task's content; idempotency is the caller's concern.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// A `Task` has a stable [`name`](Task::name) and an async [`run`](Task::run)
/// method that receives a [`CancellationToken`]. Implementors should regularly
/// check cancellation and exit promptly; the runtime provides no preemption,
/// only signaling.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use tickwork::{Task, TaskError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes the task until completion or cancellation.
    ///
    /// Return [`TaskError::Canceled`] when exiting because `ctx` was
    /// cancelled, so the worker can record the execution as canceled rather
    /// than failed.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
