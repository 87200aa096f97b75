//! # Worker lifecycle state machine.
//!
//! Both workers share the same Start/Stop/Dispose contract, captured here as
//! an explicit state machine:
//!
//! ```text
//! NotStarted ──start──► Running ──stop──► Stopping ──► Stopped
//!     │                    │                 │            │
//!     └────────────────────┴───── dispose ───┴────────────┘──► Disposed (terminal)
//! ```
//!
//! Rules:
//! - A stopped worker is **not** restartable; a fresh instance is required.
//! - `Disposed` is reachable from any state, idempotent, and terminal.
//! - `start` on anything but `NotStarted` fails explicitly, never silently.
//! - `stop` before `start`, or a second `stop`, is a no-op.

use std::sync::{Mutex, PoisonError};

use crate::error::StartError;

/// Observable worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created but never started.
    NotStarted,
    /// Consumer loop / timer driver is active.
    Running,
    /// Stop requested; waiting for the in-flight execution to drain.
    Stopping,
    /// Fully stopped. Not restartable.
    Stopped,
    /// Terminal. All further operations are refused or no-ops.
    Disposed,
}

/// What a `stop` call should do, as decided by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopDecision {
    /// Worker was running; proceed with cancellation and the drain wait.
    Proceed,
    /// Nothing to stop (never started, already stopping, or stopped).
    NoOp,
    /// Worker is disposed; report it, then do nothing.
    Disposed,
}

/// Mutex-guarded lifecycle cell shared by both worker types.
#[derive(Debug)]
pub(crate) struct LifecycleCell {
    state: Mutex<Lifecycle>,
}

impl LifecycleCell {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(Lifecycle::NotStarted),
        }
    }

    pub(crate) fn state(&self) -> Lifecycle {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `NotStarted -> Running`; everything else is an explicit refusal.
    pub(crate) fn begin_start(&self) -> Result<(), StartError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            Lifecycle::NotStarted => {
                *state = Lifecycle::Running;
                Ok(())
            }
            Lifecycle::Running | Lifecycle::Stopping => Err(StartError::AlreadyStarted),
            Lifecycle::Stopped => Err(StartError::Stopped),
            Lifecycle::Disposed => Err(StartError::Disposed),
        }
    }

    /// `Running -> Stopping` when a stop is actually needed.
    pub(crate) fn begin_stop(&self) -> StopDecision {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            Lifecycle::Running => {
                *state = Lifecycle::Stopping;
                StopDecision::Proceed
            }
            Lifecycle::NotStarted | Lifecycle::Stopping | Lifecycle::Stopped => StopDecision::NoOp,
            Lifecycle::Disposed => StopDecision::Disposed,
        }
    }

    /// `Stopping -> Stopped`. Harmless if dispose won the race in between.
    pub(crate) fn finish_stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == Lifecycle::Stopping {
            *state = Lifecycle::Stopped;
        }
    }

    /// Any state `-> Disposed`. Returns `true` on the first transition only.
    pub(crate) fn dispose(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == Lifecycle::Disposed {
            false
        } else {
            *state = Lifecycle::Disposed;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_happy_path() {
        let cell = LifecycleCell::new();
        assert_eq!(cell.state(), Lifecycle::NotStarted);

        cell.begin_start().unwrap();
        assert_eq!(cell.state(), Lifecycle::Running);

        assert_eq!(cell.begin_stop(), StopDecision::Proceed);
        assert_eq!(cell.state(), Lifecycle::Stopping);

        cell.finish_stop();
        assert_eq!(cell.state(), Lifecycle::Stopped);
    }

    #[test]
    fn double_start_is_refused() {
        let cell = LifecycleCell::new();
        cell.begin_start().unwrap();
        assert_eq!(cell.begin_start(), Err(StartError::AlreadyStarted));
    }

    #[test]
    fn stopped_worker_is_not_restartable() {
        let cell = LifecycleCell::new();
        cell.begin_start().unwrap();
        cell.begin_stop();
        cell.finish_stop();
        assert_eq!(cell.begin_start(), Err(StartError::Stopped));
    }

    #[test]
    fn stop_before_start_is_noop() {
        let cell = LifecycleCell::new();
        assert_eq!(cell.begin_stop(), StopDecision::NoOp);
        assert_eq!(cell.state(), Lifecycle::NotStarted);
    }

    #[test]
    fn second_stop_is_noop() {
        let cell = LifecycleCell::new();
        cell.begin_start().unwrap();
        assert_eq!(cell.begin_stop(), StopDecision::Proceed);
        assert_eq!(cell.begin_stop(), StopDecision::NoOp);
    }

    #[test]
    fn dispose_is_terminal_and_idempotent() {
        let cell = LifecycleCell::new();
        assert!(cell.dispose());
        assert!(!cell.dispose());
        assert_eq!(cell.state(), Lifecycle::Disposed);
        assert_eq!(cell.begin_start(), Err(StartError::Disposed));
        assert_eq!(cell.begin_stop(), StopDecision::Disposed);
    }

    #[test]
    fn dispose_reachable_from_running() {
        let cell = LifecycleCell::new();
        cell.begin_start().unwrap();
        assert!(cell.dispose());
        assert_eq!(cell.state(), Lifecycle::Disposed);
        // finish_stop after dispose must not resurrect the worker.
        cell.finish_stop();
        assert_eq!(cell.state(), Lifecycle::Disposed);
    }
}
