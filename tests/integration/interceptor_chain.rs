//! Interceptor ordering, dropping, and parameter merging through the manager.

use std::sync::Arc;

use analytics_relay::manager::SharedInterceptor;
use analytics_relay::{
    DispatchOutcome, Event, FnInterceptor, GlobalParametersInterceptor, Manager, Value,
};

use crate::integration::test_utils::{interceptor, provider, CountingInterceptor, RecordingProvider};

/// Renames `checkout` to `purchase`.
fn rename() -> SharedInterceptor {
    Arc::new(FnInterceptor::new("rename", |event: Event| {
        if event.name() == "checkout" {
            Some(event.renamed("purchase"))
        } else {
            Some(event)
        }
    }))
}

/// Records which name it saw in a `seen_as` parameter.
fn tag_seen_name() -> SharedInterceptor {
    Arc::new(FnInterceptor::new("tag", |event: Event| {
        let seen = event.name().to_string();
        Some(event.with_parameter("seen_as", seen))
    }))
}

fn deliver_through(interceptors: Vec<SharedInterceptor>) -> Event {
    let manager = Manager::new();
    let sink = RecordingProvider::new("sink");
    manager.add_provider(provider(&sink));
    manager.register_interceptors(interceptors);
    manager.track(Event::new("checkout")).unwrap();
    sink.tracked().remove(0)
}

#[test]
fn chain_order_determines_result() {
    let rename_first = deliver_through(vec![rename(), tag_seen_name()]);
    let tag_first = deliver_through(vec![tag_seen_name(), rename()]);

    assert_eq!(rename_first.name(), "purchase");
    assert_eq!(rename_first.parameter("seen_as"), Some(&Value::from("purchase")));

    assert_eq!(tag_first.name(), "purchase");
    assert_eq!(tag_first.parameter("seen_as"), Some(&Value::from("checkout")));
}

#[test]
fn drop_halts_chain_and_delivery() {
    let manager = Manager::new();
    let sink = RecordingProvider::new("sink");
    let before = CountingInterceptor::new("before");
    let after = CountingInterceptor::new("after");
    manager.add_provider(provider(&sink));
    manager.register_interceptors(vec![
        interceptor(&before),
        Arc::new(FnInterceptor::new("veto", |_event: Event| None)),
        interceptor(&after),
    ]);

    let outcome = manager.track(Event::new("purchase")).unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Dropped {
            interceptor: "veto".to_string()
        }
    );
    assert_eq!(before.count(), 1);
    assert_eq!(after.count(), 0);
    assert!(sink.tracked().is_empty());
}

#[test]
fn conditional_drop_only_affects_matching_events() {
    let manager = Manager::new();
    let sink = RecordingProvider::new("sink");
    manager.add_provider(provider(&sink));
    manager.add_interceptor(Arc::new(FnInterceptor::new("no_debug", |event: Event| {
        (!event.name().starts_with("debug_")).then_some(event)
    })));

    manager.track(Event::new("debug_ping")).unwrap();
    manager.track(Event::new("purchase")).unwrap();

    let names: Vec<String> = sink.tracked().iter().map(|e| e.name().to_string()).collect();
    assert_eq!(names, vec!["purchase".to_string()]);
}

#[test]
fn global_parameters_never_overwrite_event_values() {
    let manager = Manager::new();
    let sink = RecordingProvider::new("sink");
    manager.add_provider(provider(&sink));
    manager.add_interceptor(Arc::new(GlobalParametersInterceptor::from_pairs([
        ("app_version", "1.0"),
        ("platform", "linux"),
    ])));

    let event = Event::new("purchase").with_parameter("app_version", "2.0");
    manager.track(event).unwrap();

    let delivered = sink.tracked().remove(0);
    assert_eq!(delivered.parameter("app_version"), Some(&Value::from("2.0")));
    assert_eq!(delivered.parameter("platform"), Some(&Value::from("linux")));
}

#[test]
fn register_interceptors_replaces_chain() {
    let manager = Manager::new();
    let first = CountingInterceptor::new("first");
    let second = CountingInterceptor::new("second");
    manager.register_interceptors(vec![interceptor(&first)]);
    manager.register_interceptors(vec![interceptor(&second)]);
    manager.add_interceptor(interceptor(&first));
    assert_eq!(
        manager.interceptor_names(),
        vec!["second".to_string(), "first".to_string()]
    );

    manager.track(Event::new("open")).unwrap();
    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 1);
}

#[test]
fn disabled_manager_runs_no_interceptors() {
    let manager = Manager::new();
    let counter = CountingInterceptor::new("count");
    manager.add_interceptor(interceptor(&counter));
    manager.set_enabled(false);
    manager.track(Event::new("open")).unwrap();
    assert_eq!(counter.count(), 0);
}
