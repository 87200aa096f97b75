//! Timed worker behavior under a paused clock: cadence, single-flight
//! skipping, preserve-period gaps, and live reconfiguration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use tickwork::{
    Bus, Event, EventKind, StartError, TaskError, TaskFn, TaskRef, TimedOptions, TimedWorker,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Collects every event published on the bus into a shared vec.
fn spawn_collector(bus: &Bus) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            sink.lock().unwrap().push(ev);
        }
    });
    events
}

fn count_kind(events: &Arc<Mutex<Vec<Event>>>, kind: EventKind) -> usize {
    events.lock().unwrap().iter().filter(|e| e.kind == kind).count()
}

/// A task body that records its start offset from `base`, then stays busy for
/// `busy` (cooperatively cancellable).
fn paced_task(log: &Arc<Mutex<Vec<Duration>>>, base: Instant, busy: Duration) -> TaskRef {
    let log = Arc::clone(log);
    TaskFn::arc("paced", move |ctx: CancellationToken| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(base.elapsed());
            if busy > Duration::ZERO {
                tokio::select! {
                    _ = tokio::time::sleep(busy) => {}
                    _ = ctx.cancelled() => return Err(TaskError::Canceled),
                }
            }
            Ok(())
        }
    })
}

#[tokio::test(start_paused = true)]
async fn fixed_rate_fires_about_t_over_p_times_with_no_overlap() {
    let bus = Bus::default();
    let signal = CancellationToken::new();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let starts = Arc::new(AtomicUsize::new(0));
    let (a, p, s) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&starts));
    let counter = TaskFn::arc("counter", move |_ctx| {
        let (a, p, s) = (Arc::clone(&a), Arc::clone(&p), Arc::clone(&s));
        async move {
            s.fetch_add(1, Ordering::SeqCst);
            let n = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(n, Ordering::SeqCst);
            a.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let worker = TimedWorker::new(
        "metronome",
        counter,
        bus.clone(),
        TimedOptions {
            period: ms(100),
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    tokio::time::sleep(ms(1000)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();

    // Firings at 0, 100, ..., 900; the tick racing the stop may add one.
    let fired = starts.load(Ordering::SeqCst);
    assert!((10..=11).contains(&fired), "fired {fired} times");
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_body_on_fixed_rate_skips_busy_ticks_and_keeps_the_grid() {
    let bus = Bus::default();
    let events = spawn_collector(&bus);
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    // Body takes 250ms against a 100ms period: every tick that lands while a
    // run is in flight is skipped, and starts stay on the wall-clock grid.
    let worker = TimedWorker::new(
        "skipper",
        paced_task(&log, base, ms(250)),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    tokio::time::sleep(ms(950)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();
    tokio::time::sleep(ms(1)).await;

    assert_eq!(*log.lock().unwrap(), vec![ms(0), ms(300), ms(600), ms(900)]);
    assert_eq!(count_kind(&events, EventKind::SkippingTask), 6);
}

#[tokio::test(start_paused = true)]
async fn preserve_period_waits_a_full_period_after_each_completion() {
    let bus = Bus::default();
    let events = spawn_collector(&bus);
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "spacer",
        paced_task(&log, base, ms(250)),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            preserve_period: true,
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    tokio::time::sleep(ms(1000)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();
    tokio::time::sleep(ms(1)).await;

    // 250ms runs separated by full 100ms idle gaps, no skips.
    assert_eq!(*log.lock().unwrap(), vec![ms(0), ms(350), ms(700)]);
    assert_eq!(count_kind(&events, EventKind::SkippingTask), 0);
}

#[tokio::test(start_paused = true)]
async fn period_change_is_absorbed_at_the_next_execution_boundary() {
    let bus = Bus::default();
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "retuned",
        paced_task(&log, base, ms(10)),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    tokio::time::sleep(ms(20)).await;
    worker.update_options(|o| o.period = ms(300));

    tokio::time::sleep(ms(780)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();

    // The tick at 100 still fires on the old cadence; its completion at 110
    // absorbs the change, landing the next start at 110 + 300 + 10 = 420,
    // after which the plain 300ms cadence resumes.
    assert_eq!(*log.lock().unwrap(), vec![ms(0), ms(100), ms(420), ms(720)]);
}

#[tokio::test(start_paused = true)]
async fn preserve_period_toggle_off_resumes_fixed_rate_firing() {
    let bus = Bus::default();
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "untoggled",
        paced_task(&log, base, ms(50)),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            preserve_period: true,
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    // Toggle off while the first run is in flight. The boundary at 50 must
    // re-arm the timer even though no period change is pending, restarting
    // the fixed-rate cadence from that completion.
    tokio::time::sleep(ms(20)).await;
    worker.update_options(|o| o.preserve_period = false);

    tokio::time::sleep(ms(380)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec![ms(0), ms(150), ms(250), ms(350)]);
}

#[tokio::test(start_paused = true)]
async fn period_change_during_preserve_period_is_not_double_compensated() {
    let bus = Bus::default();
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "flipped",
        paced_task(&log, base, ms(50)),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    // Period change while fixed-rate marks a reschedule; flipping to
    // preserve-period before the boundary must supersede it, not stack an
    // elapsed compensation on top of the one-shot reprogram.
    tokio::time::sleep(ms(10)).await;
    worker.update_options(|o| o.period = ms(200));
    tokio::time::sleep(ms(10)).await;
    worker.update_options(|o| o.preserve_period = true);

    tokio::time::sleep(ms(530)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();

    // Completion at 50 reprograms one-shot 200ms after it: 250, then 500.
    // A stacked compensation would have landed the second start at 300.
    assert_eq!(*log.lock().unwrap(), vec![ms(0), ms(250), ms(500)]);
}

#[tokio::test(start_paused = true)]
async fn starts_in_reprogram_applies_only_before_the_first_firing() {
    let bus = Bus::default();
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "delayed",
        paced_task(&log, base, Duration::ZERO),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            starts_in: ms(500),
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();

    // Shrink the initial delay while still pending: first firing moves to
    // 100 + 50 = 150.
    tokio::time::sleep(ms(100)).await;
    worker.update_options(|o| o.starts_in = ms(50));

    // After the first firing, starts_in changes are inert.
    tokio::time::sleep(ms(60)).await;
    worker.update_options(|o| o.starts_in = ms(5000));

    tokio::time::sleep(ms(140)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec![ms(150), ms(250)]);
}

#[tokio::test(start_paused = true)]
async fn next_task_at_is_live_while_running_and_cleared_on_stop() {
    let bus = Bus::default();
    let events = spawn_collector(&bus);
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "visible",
        paced_task(&log, base, Duration::ZERO),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            ..TimedOptions::default()
        },
    );
    assert!(worker.next_task_at().is_none());

    worker.start(&signal).unwrap();
    tokio::time::sleep(ms(10)).await;
    assert!(worker.next_task_at().is_some());

    worker.stop(&CancellationToken::new()).await.unwrap();
    assert!(worker.next_task_at().is_none());

    tokio::time::sleep(ms(1)).await;
    assert_eq!(count_kind(&events, EventKind::WorkerStartPlanned), 1);
    assert_eq!(count_kind(&events, EventKind::WorkerStopped), 1);
}

#[tokio::test(start_paused = true)]
async fn no_firings_after_stop() {
    let bus = Bus::default();
    let events = spawn_collector(&bus);
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "quiet",
        paced_task(&log, base, Duration::ZERO),
        bus.clone(),
        TimedOptions {
            period: ms(100),
            ..TimedOptions::default()
        },
    );
    worker.start(&signal).unwrap();
    tokio::time::sleep(ms(250)).await;
    worker.stop(&CancellationToken::new()).await.unwrap();

    let fired_before = log.lock().unwrap().len();
    tokio::time::sleep(ms(500)).await;
    assert_eq!(log.lock().unwrap().len(), fired_before);
    assert_eq!(
        count_kind(&events, EventKind::TaskStarted),
        count_kind(&events, EventKind::TaskCompletedWithNext)
    );
}

#[tokio::test(start_paused = true)]
async fn lifecycle_refusals_are_explicit() {
    let bus = Bus::default();
    let signal = CancellationToken::new();
    let base = Instant::now();
    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = TimedWorker::new(
        "once",
        paced_task(&log, base, Duration::ZERO),
        bus.clone(),
        TimedOptions::default(),
    );
    worker.start(&signal).unwrap();
    assert_eq!(worker.start(&signal), Err(StartError::AlreadyStarted));

    worker.stop(&CancellationToken::new()).await.unwrap();
    assert_eq!(worker.start(&signal), Err(StartError::Stopped));

    worker.dispose();
    assert_eq!(worker.start(&signal), Err(StartError::Disposed));
    worker.stop(&CancellationToken::new()).await.unwrap();
}
