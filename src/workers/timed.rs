//! # TimedWorker: timer-driven, single-flight periodic executor.
//!
//! Fires one fixed task body on a recurring timer seeded with `starts_in` and
//! `period`. A one-permit semaphore guarantees at most one execution in
//! flight: a firing that cannot take the permit is **skipped** (logged, never
//! queued) and the timer keeps its cadence.
//!
//! ```text
//! start(signal) ──► spawn driver:
//!   loop {
//!     ├─► sleep_until(next_fire)
//!     │     ├─► next_task_at = now + period        (provisional, even if skipped)
//!     │     ├─► try_acquire single-flight permit
//!     │     │     ├─ busy ──► publish SkippingTask, keep cadence
//!     │     │     └─ free ──► spawn firing (TaskStarted → ExecScope → TaskCompletedWithNext)
//!     │     └─► fixed-rate: next_fire += period (skip past `now`, no catch-up)
//!     ├─► firing completed ──► boundary:
//!     │     ├─ preserve-period ──► next_fire = completion + period
//!     │     └─ pending reschedule ──► next_fire = completion + new period + elapsed
//!     └─► options changed ──► reprogram initial delay (before first firing only)
//!   }
//! ```
//!
//! ## Cadence modes
//! - **Fixed-rate** (default): ticks every `period` on the wall clock;
//!   overlapping ticks are skipped, missed ticks are never replayed.
//! - **Preserve-period**: after each completion the timer is reprogrammed as a
//!   one-shot `period` after that completion, guaranteeing an idle gap of at
//!   least `period` between executions at the cost of cadence drift.
//!
//! ## Live reconfiguration
//! [`TimedWorker::update_options`] mutates the options under the same lock the
//! driver snapshots from, so no firing ever observes a torn option set:
//! - `starts_in` changes before the first firing reprogram the pending
//!   initial timer to the new delay.
//! - `period` changes in fixed-rate mode are absorbed at the next execution
//!   boundary, where the next fire lands `new period + elapsed` after the
//!   completion (the one compensated firing), then the regular cadence resumes.
//! - `period` changes in preserve-period mode simply feed the next one-shot
//!   reprogram; no extra compensation is applied.
//! - `preserve_period` flips take effect at the next execution boundary;
//!   flipping it off mid-run restarts the fixed-rate cadence from that
//!   completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{StartError, StopError};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskRef;
use crate::workers::lifecycle::{Lifecycle, LifecycleCell, StopDecision};
use crate::workers::next_task_id;
use crate::workers::scope::ExecScope;

/// Configuration for a [`TimedWorker`]. All fields can be changed at runtime
/// through [`TimedWorker::update_options`].
#[derive(Debug, Clone, Copy)]
pub struct TimedOptions {
    /// Interval between firings. Default: 10 seconds.
    pub period: Duration,
    /// Delay before the first firing. Default: zero (fire immediately).
    pub starts_in: Duration,
    /// Maximum time allowed per execution; `None` means unbounded.
    pub task_timeout: Option<Duration>,
    /// When `true`, the next firing is scheduled `period` after the previous
    /// execution *completed* rather than on a fixed wall-clock grid.
    pub preserve_period: bool,
}

impl Default for TimedOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            starts_in: Duration::ZERO,
            task_timeout: None,
            preserve_period: false,
        }
    }
}

/// Options plus the reschedule bookkeeping shared with the driver.
#[derive(Debug)]
struct OptionState {
    opts: TimedOptions,
    /// Set when `period` changes in fixed-rate mode; consumed at the next
    /// execution boundary.
    pending_reschedule: bool,
}

/// Timer-driven, single-flight executor of one task body.
pub struct TimedWorker {
    name: Arc<str>,
    task: TaskRef,
    bus: Bus,
    lifecycle: LifecycleCell,
    executing: Arc<AtomicBool>,
    opts: Arc<Mutex<OptionState>>,
    version_tx: watch::Sender<u64>,
    gate: Arc<Semaphore>,
    next_task_at: Arc<Mutex<Option<SystemTime>>>,
    stop_token: Mutex<Option<CancellationToken>>,
    driver_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimedWorker {
    /// Creates a worker that will fire `task` per `options`. Nothing runs
    /// until [`start`](TimedWorker::start).
    pub fn new(name: impl Into<Arc<str>>, task: TaskRef, bus: Bus, options: TimedOptions) -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            name: name.into(),
            task,
            bus,
            lifecycle: LifecycleCell::new(),
            executing: Arc::new(AtomicBool::new(false)),
            opts: Arc::new(Mutex::new(OptionState {
                opts: options,
                pending_reschedule: false,
            })),
            version_tx,
            gate: Arc::new(Semaphore::new(1)),
            next_task_at: Arc::new(Mutex::new(None)),
            stop_token: Mutex::new(None),
            driver_handle: Mutex::new(None),
        }
    }

    /// Worker name, used in events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.lifecycle.state()
    }

    /// Whether the timer driver is active.
    pub fn has_started(&self) -> bool {
        self.lifecycle.state() == Lifecycle::Running
    }

    /// Whether a firing is currently in flight.
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// The provisional time of the next firing, if the worker is running.
    /// Updated on every firing (even skipped ones) and cleared on stop.
    pub fn next_task_at(&self) -> Option<SystemTime> {
        *self
            .next_task_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current options.
    pub fn options(&self) -> TimedOptions {
        self.opts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .opts
    }

    /// Applies `mutate` to the options under the lock shared with the
    /// execution path, then notifies the driver.
    ///
    /// A `period` change in fixed-rate mode is absorbed at the next execution
    /// boundary; a `starts_in` change before the first firing reprograms the
    /// initial delay. The in-flight execution (if any) is never affected.
    pub fn update_options(&self, mutate: impl FnOnce(&mut TimedOptions)) {
        {
            let mut state = self.opts.lock().unwrap_or_else(PoisonError::into_inner);
            let period_before = state.opts.period;
            mutate(&mut state.opts);
            if state.opts.period != period_before && !state.opts.preserve_period {
                state.pending_reschedule = true;
            }
        }
        self.version_tx.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Starts the timer driver. Non-blocking; returns once the driver is
    /// spawned. The stop token is derived from `signal`.
    pub fn start(&self, signal: &CancellationToken) -> Result<(), StartError> {
        if let Err(refusal) = self.lifecycle.begin_start() {
            self.publish_refusal(refusal);
            return Err(refusal);
        }

        let opts = self.options();
        self.bus.publish(
            Event::new(EventKind::WorkerStartPlanned, self.name.clone())
                .with_next_at(SystemTime::now() + opts.starts_in)
                .with_period(opts.period),
        );

        let stop = signal.child_token();
        *self
            .stop_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(stop.clone());

        let driver = Driver {
            name: self.name.clone(),
            task: Arc::clone(&self.task),
            bus: self.bus.clone(),
            opts: Arc::clone(&self.opts),
            version_rx: self.version_tx.subscribe(),
            gate: Arc::clone(&self.gate),
            next_task_at: Arc::clone(&self.next_task_at),
            executing: Arc::clone(&self.executing),
        };
        let handle = tokio::spawn(driver.run(stop));
        *self
            .driver_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(())
    }

    /// Stops the worker: cancels the stop token (halting the timer), then
    /// waits for the in-flight firing to observe cancellation and return,
    /// bounded by `deadline`.
    ///
    /// The firing's own failure or cancellation is never surfaced here.
    /// Calling stop before start, or twice, is a no-op.
    pub async fn stop(&self, deadline: &CancellationToken) -> Result<(), StopError> {
        match self.lifecycle.begin_stop() {
            StopDecision::NoOp => return Ok(()),
            StopDecision::Disposed => {
                self.bus
                    .publish(Event::new(EventKind::WorkerDisposed, self.name.clone()));
                return Ok(());
            }
            StopDecision::Proceed => {}
        }

        self.bus
            .publish(Event::new(EventKind::WorkerStopping, self.name.clone()));

        if let Some(token) = self
            .stop_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }

        let handle = self
            .driver_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut deadline_hit = false;
        if let Some(handle) = handle {
            tokio::select! {
                joined = handle => { let _ = joined; }
                _ = deadline.cancelled() => { deadline_hit = true; }
            }
        }

        self.lifecycle.finish_stop();
        *self
            .next_task_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;

        if deadline_hit {
            return Err(StopError::DeadlineExceeded {
                worker: self.name.to_string(),
            });
        }
        self.bus
            .publish(Event::new(EventKind::WorkerStopped, self.name.clone()));
        Ok(())
    }

    /// Disposes the worker: cancels the stop token and marks the instance
    /// terminal. Idempotent; reachable from any state.
    pub fn dispose(&self) {
        if !self.lifecycle.dispose() {
            return;
        }
        if let Some(token) = self
            .stop_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }
    }

    fn publish_refusal(&self, refusal: StartError) {
        let ev = match refusal {
            StartError::AlreadyStarted | StartError::Stopped => {
                Event::new(EventKind::WorkerAlreadyStarted, self.name.clone())
                    .with_reason(refusal.as_label())
            }
            StartError::Disposed => Event::new(EventKind::WorkerDisposed, self.name.clone()),
        };
        self.bus.publish(ev);
    }
}

/// State moved into the spawned timer loop.
struct Driver {
    name: Arc<str>,
    task: TaskRef,
    bus: Bus,
    opts: Arc<Mutex<OptionState>>,
    version_rx: watch::Receiver<u64>,
    gate: Arc<Semaphore>,
    next_task_at: Arc<Mutex<Option<SystemTime>>>,
    executing: Arc<AtomicBool>,
}

/// Reads the current options.
fn snapshot(opts: &Mutex<OptionState>) -> TimedOptions {
    opts.lock().unwrap_or_else(PoisonError::into_inner).opts
}

/// Reads the options and consumes the pending-reschedule flag in one critical
/// section (the execution boundary).
fn take_boundary(opts: &Mutex<OptionState>) -> (TimedOptions, bool) {
    let mut state = opts.lock().unwrap_or_else(PoisonError::into_inner);
    let pending = state.pending_reschedule;
    state.pending_reschedule = false;
    (state.opts, pending)
}

fn set_next_task_at(cell: &Mutex<Option<SystemTime>>, at: SystemTime) {
    *cell.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);
}

impl Driver {
    async fn run(self, stop: CancellationToken) {
        let Driver {
            name,
            task,
            bus,
            opts,
            mut version_rx,
            gate,
            next_task_at,
            executing,
        } = self;

        let initial = snapshot(&opts);
        // Cadence advances fixed-rate ticks; it is refreshed only at execution
        // boundaries so a live period change never shifts ticks mid-cycle.
        let mut cadence = initial.period;
        let mut last_starts_in = initial.starts_in;
        let mut next_fire = Instant::now() + initial.starts_in;
        // Disarmed while preserve-period waits for a completion to reprogram.
        let mut armed = true;
        let mut fired = false;
        let mut reconfig_open = true;
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Duration>();

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,

                _ = time::sleep_until(next_fire), if armed => {
                    fired = true;
                    let snap = snapshot(&opts);
                    let provisional = SystemTime::now() + snap.period;
                    set_next_task_at(&next_task_at, provisional);

                    match Arc::clone(&gate).try_acquire_owned() {
                        Err(_busy) => {
                            bus.publish(Event::new(EventKind::SkippingTask, name.clone()));
                            next_fire = advance(next_fire, cadence);
                        }
                        Ok(permit) => {
                            tokio::spawn(execute_firing(FiringCtx {
                                _permit: permit,
                                name: name.clone(),
                                task: Arc::clone(&task),
                                bus: bus.clone(),
                                stop: stop.clone(),
                                timeout: snap.task_timeout,
                                next_at: provisional,
                                executing: Arc::clone(&executing),
                                done: done_tx.clone(),
                            }));
                            if snap.preserve_period {
                                armed = false;
                            } else {
                                next_fire = advance(next_fire, cadence);
                            }
                        }
                    }
                }

                Some(elapsed) = done_rx.recv() => {
                    let (snap, pending) = take_boundary(&opts);
                    cadence = snap.period;
                    if snap.preserve_period {
                        next_fire = Instant::now() + snap.period;
                        armed = true;
                        set_next_task_at(&next_task_at, SystemTime::now() + snap.period);
                    } else if pending {
                        let delay = snap.period + elapsed;
                        next_fire = Instant::now() + delay;
                        armed = true;
                        set_next_task_at(&next_task_at, SystemTime::now() + delay);
                    } else if !armed {
                        // Preserve-period was switched off while this firing
                        // ran; the fire branch left the timer disarmed, so the
                        // fixed-rate cadence restarts from this completion.
                        next_fire = Instant::now() + snap.period;
                        armed = true;
                        set_next_task_at(&next_task_at, SystemTime::now() + snap.period);
                    }
                }

                changed = version_rx.changed(), if reconfig_open => {
                    if changed.is_err() {
                        reconfig_open = false;
                        continue;
                    }
                    let snap = snapshot(&opts);
                    if !fired && snap.starts_in != last_starts_in {
                        next_fire = Instant::now() + snap.starts_in;
                    }
                    last_starts_in = snap.starts_in;
                    // Period changes are absorbed at execution boundaries;
                    // preserve-period flips are observed on the next snapshot.
                }
            }
        }

        // Drain: the in-flight firing (if any) holds the permit until it
        // returns, so stopping waits for it here.
        let _drained = gate.acquire().await;
    }
}

/// Advances a fixed-rate deadline by one period, skipping past `now` without
/// queueing catch-up firings.
fn advance(mut next_fire: Instant, cadence: Duration) -> Instant {
    let now = Instant::now();
    next_fire += cadence;
    while next_fire <= now {
        next_fire += cadence;
    }
    next_fire
}

struct FiringCtx {
    /// Single-flight permit; dropped (released) on every exit path.
    _permit: tokio::sync::OwnedSemaphorePermit,
    name: Arc<str>,
    task: TaskRef,
    bus: Bus,
    stop: CancellationToken,
    timeout: Option<Duration>,
    next_at: SystemTime,
    executing: Arc<AtomicBool>,
    done: mpsc::UnboundedSender<Duration>,
}

/// One scheduler firing: status/elapsed accounting around the task body.
async fn execute_firing(ctx: FiringCtx) {
    let task_id: Arc<str> = next_task_id().into();
    ctx.bus
        .publish(Event::new(EventKind::TaskStarted, ctx.name.clone()).with_task_id(task_id.clone()));

    ctx.executing.store(true, Ordering::SeqCst);
    let outcome = ExecScope::new(ctx.stop.clone(), ctx.timeout)
        .execute(ctx.task.as_ref())
        .await;
    ctx.executing.store(false, Ordering::SeqCst);

    if let Some(err) = &outcome.error {
        ctx.bus.publish(
            Event::new(EventKind::CaughtException, ctx.name.clone())
                .with_task_id(task_id.clone())
                .with_reason(err.to_string()),
        );
    }
    ctx.bus.publish(
        Event::new(EventKind::TaskCompletedWithNext, ctx.name.clone())
            .with_task_id(task_id)
            .with_status(outcome.status)
            .with_elapsed(outcome.elapsed)
            .with_next_at(ctx.next_at),
    );

    // The driver may already be gone during shutdown; that is fine.
    let _ = ctx.done.send(outcome.elapsed);
}
