//! Event consumers: the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and the built-in tracing-backed [`LogWriter`].

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
