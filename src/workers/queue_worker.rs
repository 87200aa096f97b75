//! # QueueWorker: sequential consumer over a shared [`TaskQueue`].
//!
//! Start spawns a detached consumer loop bound to a stop token derived from
//! the caller's signal. The loop dequeues one task at a time, runs it under an
//! [`ExecScope`](super::scope::ExecScope) (stop signal AND optional
//! per-task timeout), records status and elapsed time, and loops immediately.
//!
//! ```text
//! start(signal) ──► spawn loop:
//!   loop {
//!     ├─► dequeue (suspends; cancellable)
//!     ├─► publish TaskStarted
//!     ├─► ExecScope::execute ──► Success / Canceled / TimedOut / Failed
//!     ├─► publish CaughtException (on error) + TaskCompleted
//!     └─► continue (no pacing)
//!   }
//! stop(deadline) ──► cancel stop token ──► await loop drain (bounded)
//! ```
//!
//! ## Rules
//! - Exactly one task executes at a time per worker instance.
//! - Task errors never escape the loop; they become a status and an event.
//! - `stop` swallows the in-flight task's own failure/cancellation; its only
//!   error is the caller's deadline firing first.
//! - Several workers may share one queue for fan-out; each stays sequential.
//! - Closing the queue ends the loop and moves the worker to `Stopped`; a
//!   later `stop` call is then a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, StartError, StopError};
use crate::events::{Bus, Event, EventKind};
use crate::queue::TaskQueue;
use crate::workers::lifecycle::{Lifecycle, LifecycleCell, StopDecision};
use crate::workers::next_task_id;
use crate::workers::scope::ExecScope;

/// Configuration for a [`QueueWorker`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueWorkerOptions {
    /// Maximum time allowed per task execution; `None` means unbounded.
    pub task_timeout: Option<Duration>,
}

/// Sequential consumer of a shared [`TaskQueue`].
pub struct QueueWorker {
    name: Arc<str>,
    queue: Arc<TaskQueue>,
    options: QueueWorkerOptions,
    bus: Bus,
    /// Shared with the consumer loop so a queue closure can finish the stop.
    lifecycle: Arc<LifecycleCell>,
    executing: Arc<AtomicBool>,
    stop_token: Mutex<Option<CancellationToken>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl QueueWorker {
    /// Creates a worker attached to `queue`. Nothing runs until
    /// [`start`](QueueWorker::start).
    pub fn new(
        name: impl Into<Arc<str>>,
        queue: Arc<TaskQueue>,
        bus: Bus,
        options: QueueWorkerOptions,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            options,
            bus,
            lifecycle: Arc::new(LifecycleCell::new()),
            executing: Arc::new(AtomicBool::new(false)),
            stop_token: Mutex::new(None),
            loop_handle: Mutex::new(None),
        }
    }

    /// Worker name, used in events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.lifecycle.state()
    }

    /// Whether the consumer loop is active.
    pub fn has_started(&self) -> bool {
        self.lifecycle.state() == Lifecycle::Running
    }

    /// Whether a task is currently in flight.
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// Starts the consumer loop. Non-blocking; returns once the loop is
    /// spawned.
    ///
    /// The loop's stop token is derived from `signal`, so cancelling `signal`
    /// also initiates shutdown.
    pub fn start(&self, signal: &CancellationToken) -> Result<(), StartError> {
        if let Err(refusal) = self.lifecycle.begin_start() {
            self.publish_refusal(refusal);
            return Err(refusal);
        }

        let stop = signal.child_token();
        *self
            .stop_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(stop.clone());

        self.bus
            .publish(Event::new(EventKind::WorkerStarted, self.name.clone()));

        let handle = tokio::spawn(consume_loop(
            self.name.clone(),
            Arc::clone(&self.queue),
            self.bus.clone(),
            self.options,
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.executing),
            stop,
        ));
        *self
            .loop_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(())
    }

    /// Stops the worker: cancels the stop token, then waits for the in-flight
    /// task to observe cancellation and return, bounded by `deadline`.
    ///
    /// The in-flight task's own failure or cancellation is never surfaced
    /// here. Calling stop before start, or twice, is a no-op.
    pub async fn stop(&self, deadline: &CancellationToken) -> Result<(), StopError> {
        match self.lifecycle.begin_stop() {
            StopDecision::NoOp => return Ok(()),
            StopDecision::Disposed => {
                self.bus
                    .publish(Event::new(EventKind::WorkerDisposed, self.name.clone()));
                return Ok(());
            }
            StopDecision::Proceed => {}
        }

        self.bus
            .publish(Event::new(EventKind::WorkerStopping, self.name.clone()));

        if let Some(token) = self
            .stop_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }

        let handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            tokio::select! {
                // The stop contract reports only the deadline; the join result
                // carries nothing the caller may see.
                joined = handle => { let _ = joined; }
                _ = deadline.cancelled() => {
                    self.lifecycle.finish_stop();
                    return Err(StopError::DeadlineExceeded {
                        worker: self.name.to_string(),
                    });
                }
            }
        }

        self.lifecycle.finish_stop();
        self.bus
            .publish(Event::new(EventKind::WorkerStopped, self.name.clone()));
        Ok(())
    }

    /// Disposes the worker: cancels the stop token and marks the instance
    /// terminal. Idempotent; reachable from any state.
    pub fn dispose(&self) {
        if !self.lifecycle.dispose() {
            return;
        }
        if let Some(token) = self
            .stop_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }
    }

    fn publish_refusal(&self, refusal: StartError) {
        let ev = match refusal {
            StartError::AlreadyStarted | StartError::Stopped => {
                Event::new(EventKind::WorkerAlreadyStarted, self.name.clone())
                    .with_reason(refusal.as_label())
            }
            StartError::Disposed => Event::new(EventKind::WorkerDisposed, self.name.clone()),
        };
        self.bus.publish(ev);
    }
}

/// The detached consumer loop. Runs until the stop token cancels or the queue
/// closes; never exits because of a task error. A closure-driven exit also
/// moves the lifecycle to `Stopped` so the worker does not report itself as
/// running with no loop behind it.
async fn consume_loop(
    name: Arc<str>,
    queue: Arc<TaskQueue>,
    bus: Bus,
    options: QueueWorkerOptions,
    lifecycle: Arc<LifecycleCell>,
    executing: Arc<AtomicBool>,
    stop: CancellationToken,
) {
    let scope = ExecScope::new(stop.clone(), options.task_timeout);

    while !stop.is_cancelled() {
        let task = match queue.dequeue(&stop).await {
            Ok(task) => task,
            Err(QueueError::Canceled) => break,
            Err(QueueError::Closed) => {
                if lifecycle.begin_stop() == StopDecision::Proceed {
                    lifecycle.finish_stop();
                    bus.publish(Event::new(EventKind::WorkerStopped, name.clone()));
                }
                break;
            }
        };

        let task_id: Arc<str> = next_task_id().into();
        bus.publish(
            Event::new(EventKind::TaskStarted, name.clone()).with_task_id(task_id.clone()),
        );

        executing.store(true, Ordering::SeqCst);
        let outcome = scope.execute(task.as_ref()).await;
        executing.store(false, Ordering::SeqCst);

        if let Some(err) = &outcome.error {
            bus.publish(
                Event::new(EventKind::CaughtException, name.clone())
                    .with_task_id(task_id.clone())
                    .with_reason(err.to_string()),
            );
        }
        bus.publish(
            Event::new(EventKind::TaskCompleted, name.clone())
                .with_task_id(task_id)
                .with_status(outcome.status)
                .with_elapsed(outcome.elapsed),
        );
    }
}
