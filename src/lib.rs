//! # tickwork
//!
//! **tickwork** provides two background-execution primitives for long-running
//! tokio processes:
//!
//! - a bounded, backpressure-aware [`TaskQueue`] drained sequentially by a
//!   [`QueueWorker`], and
//! - a timer-driven [`TimedWorker`] that fires one task body periodically,
//!   with single-flight guarding and live option reconfiguration.
//!
//! Both are built on the same engine: an explicit lifecycle state machine,
//! composed cancellation (service stop AND optional per-execution timeout),
//! and an event bus for observability.
//!
//! ## Architecture
//! ```text
//!  Producers ──enqueue──► TaskQueue (bounded FIFO) ──dequeue──► QueueWorker
//!                              ▲                                   │ one task
//!                              │ (N producers / M workers)         │ at a time
//!                              └──────────── fan-out ◄─────────────┘
//!
//!  Timer ──tick──► TimedWorker ──try-acquire──► single-flight gate
//!                      │                          ├─ busy → SkippingTask
//!                      │                          └─ free → run task body
//!                      └── update_options() ──► absorbed at the next boundary
//!
//!  Both ── publish(Event) ──► Bus ──► SubscriberSet ──► LogWriter / custom
//! ```
//!
//! ## Lifecycle
//! ```text
//! NotStarted ──start──► Running ──stop──► Stopping ──► Stopped
//!     └──────────────────────── dispose ─────────────────┴──► Disposed
//! ```
//! A stopped worker is not restartable; `start` on a disposed worker fails
//! explicitly. `stop` waits for the in-flight execution to observe
//! cancellation, bounded by the caller's deadline, and never surfaces the
//! execution's own failure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tickwork::{
//!     Bus, QueueWorker, QueueWorkerOptions, TaskFn, TaskQueue, TimedOptions, TimedWorker,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Bus::default();
//!     let signal = CancellationToken::new();
//!
//!     // Queue side: producers enqueue, the worker drains FIFO.
//!     let queue = Arc::new(TaskQueue::new(16));
//!     let worker = QueueWorker::new(
//!         "mailer",
//!         Arc::clone(&queue),
//!         bus.clone(),
//!         QueueWorkerOptions::default(),
//!     );
//!     worker.start(&signal)?;
//!     queue
//!         .enqueue(
//!             TaskFn::arc("welcome-mail", |_ctx| async { Ok(()) }),
//!             &signal,
//!         )
//!         .await?;
//!
//!     // Timed side: one body fired periodically, never overlapping itself.
//!     let cleanup = TimedWorker::new(
//!         "cleanup",
//!         TaskFn::arc("cleanup", |_ctx| async { Ok(()) }),
//!         bus.clone(),
//!         TimedOptions {
//!             period: Duration::from_secs(30),
//!             ..TimedOptions::default()
//!         },
//!     );
//!     cleanup.start(&signal)?;
//!     cleanup.update_options(|o| o.period = Duration::from_secs(60));
//!
//!     let deadline = CancellationToken::new();
//!     worker.stop(&deadline).await?;
//!     cleanup.stop(&deadline).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod events;
mod queue;
mod status;
mod subscribers;
mod tasks;
mod workers;

// ---- Public re-exports ----

pub use error::{QueueError, StartError, StopError, TaskError};
pub use events::{Bus, Event, EventFilter, EventKind};
pub use queue::{QueueFactory, TaskQueue};
pub use status::TaskStatus;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Task, TaskFn, TaskRef};
pub use workers::{Lifecycle, QueueWorker, QueueWorkerOptions, TimedOptions, TimedWorker};
