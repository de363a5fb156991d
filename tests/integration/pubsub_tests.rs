//! The bus on a real worker thread: delivery order, thread affinity and
//! publishing from several producer threads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use sensehub::events::{EventBus, ProximitySample, EVENT_QUEUE_CAP};
use sensehub::worker::WorkQueue;

const WAIT: Duration = Duration::from_secs(5);

/// Poll `done` until it holds or [`WAIT`] elapses.
fn wait_for(done: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    done()
}

#[test]
fn delivers_in_publish_order_on_the_worker_thread() {
    let (worker, handle) = WorkQueue::<16>::spawn("bus-worker").unwrap();
    let bus = EventBus::new(worker.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe_to::<ProximitySample, _>(move |e| {
        let thread = std::thread::current().name().map(str::to_owned);
        sink.lock().push((e.sample, thread));
    })
    .unwrap();

    let count = EVENT_QUEUE_CAP as u16;
    for sample in 0..count {
        // The queue can fill while the worker is busy; retry until taken.
        while !bus.publish(ProximitySample { sample }) {
            std::thread::yield_now();
        }
    }

    assert!(wait_for(|| seen.lock().len() == usize::from(count)));
    let seen = seen.lock();
    let samples: Vec<u16> = seen.iter().map(|(s, _)| *s).collect();
    assert_eq!(samples, (0..count).collect::<Vec<_>>());
    assert!(seen.iter().all(|(_, t)| t.as_deref() == Some("bus-worker")));

    worker.request_stop();
    handle.join().unwrap();
}

#[test]
fn concurrent_producers_keep_per_producer_order() {
    let (worker, handle) = WorkQueue::<16>::spawn("bus-worker").unwrap();
    let bus = EventBus::new(worker.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe_to::<ProximitySample, _>(move |e| sink.lock().push(e.sample))
        .unwrap();

    const PER_PRODUCER: u16 = 100;
    let producers: Vec<_> = (0..4u16)
        .map(|producer| {
            let bus = bus.clone();
            std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let sample = producer * 1000 + i;
                    while !bus.publish(ProximitySample { sample }) {
                        std::thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(wait_for(|| seen.lock().len() == 4 * usize::from(PER_PRODUCER)));
    let seen = seen.lock();
    for producer in 0..4u16 {
        let mine: Vec<u16> = seen
            .iter()
            .copied()
            .filter(|s| s / 1000 == producer)
            .collect();
        let expected: Vec<u16> = (0..PER_PRODUCER).map(|i| producer * 1000 + i).collect();
        assert_eq!(mine, expected, "producer {producer} reordered");
    }

    worker.request_stop();
    handle.join().unwrap();
}
