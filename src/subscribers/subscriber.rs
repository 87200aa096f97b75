//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging custom event
//! handlers (metrics, alerting, audit trails) into the workers' event flow.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only**; other
//!   subscribers are unaffected.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Subscribers do not block publishers or each other.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use tickwork::{Subscribe, Event, EventKind};
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::CaughtException) {
//!             // export a metric, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "metrics" }
//!     fn queue_capacity(&self) -> usize { 2048 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for worker observability.
///
/// Implementations should return from [`on_event`](Subscribe::on_event)
/// quickly; long processing delays only this subscriber's own queue, and an
/// overflowing queue drops events for it.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Short, stable subscriber name used in drop/panic reports.
    fn name(&self) -> &'static str;

    /// Capacity of this subscriber's event queue (clamped to ≥ 1).
    fn queue_capacity(&self) -> usize {
        256
    }
}
