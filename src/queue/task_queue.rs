//! # TaskQueue: bounded, backpressure-aware FIFO of opaque tasks.
//!
//! A fixed-capacity channel of [`TaskRef`]s. Enqueue on a full queue suspends
//! the producer until a slot frees up (blocking backpressure; items are never
//! dropped); dequeue on an empty queue suspends the consumer. Both waits are
//! cancellable through the caller's [`CancellationToken`].
//!
//! ## Concurrency
//! Safe for N producers and M consumers. Each item is delivered to exactly one
//! consumer, in enqueue order relative to other items. With a single consumer
//! this is strict FIFO; with several consumers (fan-out workers sharing one
//! queue) delivery order per item still follows enqueue order, but completion
//! order across consumers is not coordinated.
//!
//! Built from a `tokio::sync::mpsc` bounded channel with the receiver behind a
//! `tokio::sync::Mutex`, which turns the single-consumer channel into an MPMC
//! one: consumers take the lock only for the duration of one `recv`.
//!
//! Closing drops the queue's held sender, so it never needs the receiver
//! mutex: a consumer parked in `dequeue` wakes with `Closed` once the buffered
//! items drain.

use std::sync::{Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::tasks::TaskRef;

/// Bounded FIFO of opaque tasks, shared by producers and queue workers.
///
/// Wrap in an `Arc` to share:
///
/// ```rust
/// use std::sync::Arc;
/// use tickwork::TaskQueue;
///
/// let queue = Arc::new(TaskQueue::new(16));
/// assert_eq!(queue.capacity(), 16);
/// ```
#[derive(Debug)]
pub struct TaskQueue {
    /// `None` once the queue is closed.
    tx: StdMutex<Option<mpsc::Sender<TaskRef>>>,
    rx: Mutex<mpsc::Receiver<TaskRef>>,
    capacity: usize,
}

impl TaskQueue {
    /// Creates a queue with the given fixed capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<TaskRef>(capacity);
        Self {
            tx: StdMutex::new(Some(tx)),
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// The fixed capacity this queue was created with.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueues a task, waiting for a free slot if the queue is full.
    ///
    /// Returns [`QueueError::Canceled`] if `signal` is cancelled while
    /// waiting — in that case nothing was enqueued — or
    /// [`QueueError::Closed`] if the queue has been closed.
    pub async fn enqueue(
        &self,
        task: TaskRef,
        signal: &CancellationToken,
    ) -> Result<(), QueueError> {
        if signal.is_cancelled() {
            return Err(QueueError::Canceled);
        }
        let tx = {
            let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                None => return Err(QueueError::Closed),
            }
        };
        tokio::select! {
            res = tx.send(task) => res.map_err(|_| QueueError::Closed),
            _ = signal.cancelled() => Err(QueueError::Canceled),
        }
    }

    /// Dequeues the oldest task, waiting if the queue is empty.
    ///
    /// Returns [`QueueError::Canceled`] if `signal` is cancelled while
    /// waiting, or [`QueueError::Closed`] once the queue is closed and
    /// drained.
    pub async fn dequeue(&self, signal: &CancellationToken) -> Result<TaskRef, QueueError> {
        if signal.is_cancelled() {
            return Err(QueueError::Canceled);
        }
        tokio::select! {
            item = async {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            } => item.ok_or(QueueError::Closed),
            _ = signal.cancelled() => Err(QueueError::Canceled),
        }
    }

    /// Closes the queue: pending items can still be dequeued, but further
    /// enqueues fail with [`QueueError::Closed`]. A consumer parked in
    /// [`dequeue`](TaskQueue::dequeue) wakes with `Closed` once the queue
    /// drains; an enqueue already waiting for a slot may still complete.
    pub fn close(&self) {
        // The channel closes once the last sender clone drops.
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
