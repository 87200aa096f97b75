//! End-to-end event flow: bus publish, forwarder, subscriber set fan-out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tickwork::{Bus, Event, EventFilter, EventKind, LogWriter, Subscribe, SubscriberSet};

struct Recorder {
    seen: Mutex<Vec<(u64, EventKind)>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().unwrap().push((event.seq, event.kind));
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn bus_events_fan_out_to_attached_subscribers_in_seq_order() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let bus = Bus::default();
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    let writer = Arc::new(LogWriter::with_filter(EventFilter {
        skipping_task: false,
        ..EventFilter::default()
    }));

    let set = Arc::new(SubscriberSet::new(vec![
        Arc::clone(&recorder) as Arc<dyn Subscribe>,
        writer as Arc<dyn Subscribe>,
    ]));
    assert_eq!(set.len(), 2);
    let forwarder = SubscriberSet::attach(Arc::clone(&set), &bus);

    bus.publish(Event::new(EventKind::WorkerStarted, "w"));
    bus.publish(Event::new(EventKind::TaskStarted, "w").with_task_id("@T-1-0"));
    bus.publish(Event::new(EventKind::SkippingTask, "w"));
    bus.publish(Event::new(EventKind::WorkerStopped, "w"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    forwarder.abort();

    let seen = recorder.seen.lock().unwrap();
    let kinds: Vec<EventKind> = seen.iter().map(|(_, k)| *k).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::WorkerStarted,
            EventKind::TaskStarted,
            EventKind::SkippingTask,
            EventKind::WorkerStopped,
        ]
    );
    // Sequence numbers restore publish order.
    assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
}
