//! Task abstractions: the [`Task`] trait, the function-backed [`TaskFn`],
//! and the shared handle type [`TaskRef`].

mod task;
mod task_fn;

pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
