//! Runtime events: the [`Event`] payload, [`EventKind`] classification,
//! the broadcast [`Bus`], and the per-kind [`EventFilter`].

mod bus;
mod event;
mod filter;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use filter::EventFilter;
