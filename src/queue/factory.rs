//! # QueueFactory: named registry of shared task queues.
//!
//! Long-running processes often want several independent queues ("mail",
//! "reports", ...) wired up once and looked up by name from producers and
//! workers alike. [`QueueFactory`] keeps that registry; queues are created on
//! first use and shared as `Arc<TaskQueue>` afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::TaskQueue;

/// Named registry of shared [`TaskQueue`]s.
///
/// # Example
/// ```rust
/// use tickwork::QueueFactory;
///
/// let factory = QueueFactory::new();
/// let mail = factory.get_or_create("mail", 16);
/// assert!(factory.contains("mail"));
/// assert!(std::sync::Arc::ptr_eq(&mail, &factory.get_or_create("mail", 999)));
/// ```
#[derive(Debug, Default)]
pub struct QueueFactory {
    queues: Mutex<HashMap<String, Arc<TaskQueue>>>,
}

impl QueueFactory {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the queue registered under `name`, creating it with the given
    /// capacity on first use. The capacity argument is ignored for queues
    /// that already exist.
    pub fn get_or_create(&self, name: &str, capacity: usize) -> Arc<TaskQueue> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(TaskQueue::new(capacity)))
            .clone()
    }

    /// Returns the queue registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<TaskQueue>> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether a queue is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all registered queues (unordered).
    pub fn queue_names(&self) -> Vec<String> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered queues.
    pub fn len(&self) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if no queues are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_existing_queue() {
        let factory = QueueFactory::new();
        let a = factory.get_or_create("mail", 4);
        let b = factory.get_or_create("mail", 128);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.capacity(), 4);
    }

    #[test]
    fn lookup_and_names() {
        let factory = QueueFactory::new();
        assert!(factory.is_empty());
        assert!(factory.get("reports").is_none());

        factory.get_or_create("reports", 8);
        factory.get_or_create("mail", 8);

        assert_eq!(factory.len(), 2);
        assert!(factory.contains("reports"));
        let mut names = factory.queue_names();
        names.sort();
        assert_eq!(names, vec!["mail".to_owned(), "reports".to_owned()]);
    }
}
