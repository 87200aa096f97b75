//! Per-execution completion status.
//!
//! Every execution — one dequeued task or one scheduler firing — ends in
//! exactly one [`TaskStatus`]. The three non-success outcomes stay
//! distinguishable internally (cancellation vs timeout vs failure) even when a
//! caller only cares about [`TaskStatus::is_success`].

/// Outcome of a single task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// The task body returned without an error.
    Success,
    /// The task observed the service stop signal and exited early.
    Canceled,
    /// The per-execution timeout fired before the task returned.
    TimedOut,
    /// The task returned any other error.
    Failed,
}

impl TaskStatus {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickwork::TaskStatus;
    ///
    /// assert_eq!(TaskStatus::TimedOut.as_label(), "timed_out");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskStatus::Success => "success",
            TaskStatus::Canceled => "canceled",
            TaskStatus::TimedOut => "timed_out",
            TaskStatus::Failed => "failed",
        }
    }

    /// Coalesced view for callers that only distinguish success from
    /// "not success".
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
