//! Bounded task channel: the MPMC [`TaskQueue`] and the named-queue
//! [`QueueFactory`].

mod factory;
mod task_queue;

pub use factory::QueueFactory;
pub use task_queue::TaskQueue;
