//! Dispatch-order tests for `plexus_events`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use plexus_events::prelude::*;
use plexus_registry::Registry;
use serde_json::{Map, Value, json};

// ─────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────

/// A subscriber that records its name into `log` and returns it.
fn recorder(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Subscriber {
    let log = Arc::clone(log);
    Subscriber::from_fn(name, move |_: &Call| {
        log.lock().unwrap().push(name);
        name
    })
}

fn names(subscribers: &[Subscriber]) -> Vec<&str> {
    subscribers.iter().map(Subscriber::name).collect()
}

// ─────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn react_many_orders_by_event_priority() {
    let events = EventManager::new();
    events.register("high", 3, Map::new()).unwrap();
    events.register("low", 1, Map::new()).unwrap();
    events.register("mid", 2, Map::new()).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    events.bind("high", recorder("h", &log)).unwrap();
    events.bind("low", recorder("l", &log)).unwrap();
    events.bind("mid", recorder("m", &log)).unwrap();

    let ordered = events.react_many(["high", "low", "mid"]).unwrap();
    assert_eq!(names(&ordered), vec!["l", "m", "h"]);
}

#[test]
fn equal_priorities_keep_bind_order() {
    let events = EventManager::new();
    events.register("first", 1, Map::new()).unwrap();
    events.register("second", 1, Map::new()).unwrap();
    events.register("later", 2, Map::new()).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    events.bind("later", recorder("sub_c", &log)).unwrap();
    events.bind("first", recorder("sub_a", &log)).unwrap();
    events.bind("second", recorder("sub_b", &log)).unwrap();

    let ordered = events.react_many(["later", "second", "first"]).unwrap();
    assert_eq!(names(&ordered), vec!["sub_a", "sub_b", "sub_c"]);
}

#[test]
fn react_is_repeatable() {
    let events = EventManager::new();
    events.register("e", 1, Map::new()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b", "c"] {
        events.bind("e", recorder(name, &log)).unwrap();
    }

    let first = events.react("e").unwrap();
    let second = events.react("e").unwrap();
    assert_eq!(first, second);
    assert!(log.lock().unwrap().is_empty(), "react never calls subscribers");
}

#[test]
fn react_many_rejects_unknown_labels() {
    let events = EventManager::new();
    events.register("known", 1, Map::new()).unwrap();

    assert!(matches!(
        events.react_many(["known", "unknown"]),
        Err(EventError::NotFound(label)) if label == "unknown"
    ));
}

// ─────────────────────────────────────────────────────────────────────────
// Fire and burst
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn fire_calls_in_react_order() {
    let events = EventManager::new();
    events.register("e", 1, Map::new()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b", "c"] {
        events.bind("e", recorder(name, &log)).unwrap();
    }

    let results = events.fire("e", &Call::new()).unwrap();
    assert_eq!(results, vec![json!("a"), json!("b"), json!("c")]);
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn burst_replays_captured_calls() {
    let registry = Registry::new();
    let events = registry.events();
    events.register("resize", 1, Map::new()).unwrap();

    let area = Subscriber::from_fn("area", |call: &Call| {
        let w = call.arg_at(0).and_then(Value::as_i64).unwrap_or(0);
        let h = call.arg_at(1).and_then(Value::as_i64).unwrap_or(0);
        w * h
    });
    let label = Subscriber::from_fn("label", |call: &Call| {
        call.kwarg_value("name").cloned().unwrap_or(Value::Null)
    });
    events.bind("resize", area).unwrap();
    events.bind("resize", label).unwrap();

    let queue = VecDeque::from([
        Call::from_args([3, 4]),
        Call::new().kwarg("name", "window"),
    ]);
    let results = events.burst("resize", queue).unwrap();
    assert_eq!(results, vec![json!(12), json!("window")]);
}

#[test]
fn subscribers_may_rebind_during_fire() {
    let events = Arc::new(EventManager::new());
    events.register("e", 1, Map::new()).unwrap();

    let late = Subscriber::from_fn("late", |_: &Call| "late");
    let manager = Arc::clone(&events);
    let late_clone = late.clone();
    events
        .bind(
            "e",
            Subscriber::from_fn("binder", move |_: &Call| {
                manager.bind("e", late_clone.clone()).unwrap();
                "binder"
            }),
        )
        .unwrap();

    // The running fire works on its own copy, so `late` only joins the next one.
    assert_eq!(events.fire("e", &Call::new()).unwrap(), vec![json!("binder")]);
    assert_eq!(
        events.fire("e", &Call::new()).unwrap(),
        vec![json!("binder"), json!("late")]
    );
}
