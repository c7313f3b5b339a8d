//! Concurrent tracking and registration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use analytics_relay::manager::{SharedInterceptor, SharedProvider};
use analytics_relay::{Event, FnInterceptor, Manager, Value};

use crate::integration::test_utils::{provider, RecordingProvider};

const THREADS: usize = 8;
const EVENTS_PER_THREAD: usize = 100;

/// Interceptor that appends its tag to a `trail` parameter.
fn tagger(tag: &'static str) -> SharedInterceptor {
    Arc::new(FnInterceptor::new(tag, move |event: Event| {
        let trail = match event.parameter("trail").and_then(Value::as_str) {
            Some(existing) => format!("{}>{}", existing, tag),
            None => tag.to_string(),
        };
        Some(event.with_parameter("trail", trail))
    }))
}

fn spawn_trackers(manager: &Arc<Manager>, barrier: &Arc<Barrier>) -> Vec<thread::JoinHandle<()>> {
    (0..THREADS)
        .map(|t| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for n in 0..EVENTS_PER_THREAD {
                    let event = Event::new("tick")
                        .with_parameter("thread", t as i64)
                        .with_parameter("seq", n as i64);
                    manager.track(event).unwrap();
                }
            })
        })
        .collect()
}

fn key_of(event: &Event) -> (i64, i64) {
    (
        event.parameter("thread").and_then(Value::as_i64).unwrap(),
        event.parameter("seq").and_then(Value::as_i64).unwrap(),
    )
}

fn sorted_keys(sink: &RecordingProvider) -> Vec<(i64, i64)> {
    let mut keys: Vec<_> = sink.tracked().iter().map(key_of).collect();
    keys.sort();
    keys
}

#[test]
fn concurrent_tracks_deliver_each_event_once_per_provider() {
    let manager = Arc::new(Manager::new());
    let sinks: Vec<Arc<RecordingProvider>> =
        (0..3).map(|i| RecordingProvider::new(&format!("p{}", i))).collect();
    manager.register_providers(sinks.iter().map(provider).collect());
    manager.register_interceptors(vec![tagger("a"), tagger("b")]);

    let barrier = Arc::new(Barrier::new(THREADS));
    for handle in spawn_trackers(&manager, &barrier) {
        handle.join().unwrap();
    }

    for sink in &sinks {
        let tracked = sink.tracked();
        assert_eq!(tracked.len(), THREADS * EVENTS_PER_THREAD);
        let mut seen = HashMap::new();
        for event in &tracked {
            assert_eq!(event.parameter("trail"), Some(&Value::from("a>b")));
            *seen.entry(key_of(event)).or_insert(0) += 1;
        }
        assert_eq!(seen.len(), THREADS * EVENTS_PER_THREAD);
        assert!(seen.values().all(|count| *count == 1));
    }
}

#[test]
fn registration_during_tracking_never_splits_an_event() {
    let manager = Arc::new(Manager::new());
    let old_a = RecordingProvider::new("old-a");
    let old_b = RecordingProvider::new("old-b");
    let new_a = RecordingProvider::new("new-a");
    let new_b = RecordingProvider::new("new-b");
    let old_list: Vec<SharedProvider> = vec![provider(&old_a), provider(&old_b)];
    let new_list: Vec<SharedProvider> = vec![provider(&new_a), provider(&new_b)];
    manager.register_providers(old_list.clone());

    let barrier = Arc::new(Barrier::new(THREADS + 1));
    let trackers = spawn_trackers(&manager, &barrier);

    let done = Arc::new(AtomicBool::new(false));
    let swapper = {
        let manager = manager.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut flip = false;
            while !done.load(Ordering::SeqCst) {
                let list = if flip { old_list.clone() } else { new_list.clone() };
                manager.register_providers(list);
                flip = !flip;
                thread::yield_now();
            }
        })
    };
    barrier.wait();
    for handle in trackers {
        handle.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    swapper.join().unwrap();

    // Each event went to exactly one list, and to both members of that list.
    assert_eq!(sorted_keys(&old_a), sorted_keys(&old_b));
    assert_eq!(sorted_keys(&new_a), sorted_keys(&new_b));

    let mut all = sorted_keys(&old_a);
    all.extend(sorted_keys(&new_a));
    all.sort();
    let len = all.len();
    all.dedup();
    assert_eq!(len, THREADS * EVENTS_PER_THREAD);
    assert_eq!(all.len(), len);
}

#[test]
fn interceptor_swap_applies_whole_chain_or_none() {
    let manager = Arc::new(Manager::new());
    let sink = RecordingProvider::new("sink");
    manager.add_provider(provider(&sink));
    let chain_one: Vec<SharedInterceptor> = vec![tagger("x"), tagger("y")];
    let chain_two: Vec<SharedInterceptor> = vec![tagger("p"), tagger("q"), tagger("r")];
    manager.register_interceptors(chain_one.clone());

    let barrier = Arc::new(Barrier::new(THREADS + 1));
    let trackers = spawn_trackers(&manager, &barrier);
    let done = Arc::new(AtomicBool::new(false));
    let swapper = {
        let manager = manager.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut flip = false;
            while !done.load(Ordering::SeqCst) {
                let chain = if flip { chain_one.clone() } else { chain_two.clone() };
                manager.register_interceptors(chain);
                flip = !flip;
                thread::yield_now();
            }
        })
    };
    barrier.wait();
    for handle in trackers {
        handle.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    swapper.join().unwrap();

    let tracked = sink.tracked();
    assert_eq!(tracked.len(), THREADS * EVENTS_PER_THREAD);
    for event in tracked {
        let trail = event.parameter("trail").and_then(Value::as_str).unwrap();
        assert!(trail == "x>y" || trail == "p>q>r", "partial chain: {}", trail);
    }
}
