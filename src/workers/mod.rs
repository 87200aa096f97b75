//! Worker engine shared by both execution primitives: lifecycle state
//! machine, cancellation/timeout composition, the sequential
//! [`QueueWorker`], and the single-flight [`TimedWorker`].

mod lifecycle;
mod queue_worker;
mod scope;
mod timed;

pub use lifecycle::Lifecycle;
pub use queue_worker::{QueueWorker, QueueWorkerOptions};
pub use timed::{TimedOptions, TimedWorker};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TASK_ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Builds a unique id for one execution, used only for log correlation.
pub(crate) fn next_task_id() -> String {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = TASK_ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("@T-{unix_ms}-{seq}")
}
