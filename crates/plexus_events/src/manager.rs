//! The event manager.
//!
//! An [`EventManager`] stores [`Event`] descriptors in a registry under the
//! [`Events`] tag and keeps, per event identity, the ordered list of bound
//! [`Subscriber`]s.
//!
//! # Lifecycle
//!
//! ```text
//! unregistered ──register──▶ registered ──bind/unbind──▶ registered
//!      ▲                          │
//!      └──────unregister──────────┘
//! ```
//!
//! `react`, `fire`, and `burst` never change state.
//!
//! # Ordering
//!
//! Subscribers are ordered by their event's [`Priority`] (ascending), then by
//! the order they were bound. The order is stable across calls while the
//! subscriber set is unchanged, which is what lets [`burst`](EventManager::burst)
//! pair queued calls with subscribers one to one.
//!
//! # Re-registration
//!
//! Registering a label that is already registered replaces its event with a
//! new identity. Subscribers bound to the old identity are orphaned: they are
//! no longer returned by `react` and are not moved to the new event. Unbind
//! and re-bind if continuity is needed, and call
//! [`prune_orphans`](EventManager::prune_orphans) to release orphaned lists.
//!
//! # Example
//!
//! ```
//! use plexus_events::{Call, EventManager, Priority, Subscriber};
//! use serde_json::{Map, json};
//!
//! let events = EventManager::new();
//! events.register("saved", Priority::DEFAULT, Map::new())?;
//!
//! events.bind("saved", Subscriber::from_fn("audit", |call: &Call| call.arg_at(0).cloned()))?;
//! events.bind("saved", Subscriber::from_fn("count", |_: &Call| 1))?;
//!
//! let results = events.fire("saved", &Call::new().arg("doc-7"))?;
//! assert_eq!(results, vec![json!("doc-7"), json!(1)]);
//! # Ok::<(), plexus_events::EventError>(())
//! ```

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use plexus_registry::tag::Events;
use plexus_registry::{Component, Entry, Registry, RegistryError, Service, WeakRegistry};
use serde_json::{Map, Value};

use crate::error::EventError;
use crate::event::{Event, EventId, Priority};
use crate::subscriber::{Call, Subscriber};

/// One binding of a subscriber to an event.
#[derive(Clone)]
struct Subscription {
    subscriber: Subscriber,
    /// Global bind order, used to break priority ties.
    seq: u64,
}

/// Where event descriptors live.
enum Store {
    /// A registry owned by the manager.
    Owned(Registry),
    /// The registry the manager is attached to as a service.
    Attached(WeakRegistry),
}

/// Registers events, binds subscribers, and dispatches calls.
///
/// See the [module documentation](self) for ordering and lifecycle rules.
pub struct EventManager {
    store: Store,
    subscriptions: RwLock<HashMap<EventId, Vec<Subscription>>>,
    next_seq: AtomicU64,
    enabled: AtomicBool,
}

impl Service for EventManager {}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    /// Creates a manager backed by its own registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Store::Owned(Registry::new()))
    }

    /// Creates a manager that stores events in `registry`.
    ///
    /// The manager holds a weak handle; once `registry` and all its clones
    /// are dropped, operations fail with [`EventError::Detached`].
    #[must_use]
    pub fn attached_to(registry: &Registry) -> Self {
        Self::with_store(Store::Attached(registry.downgrade()))
    }

    fn with_store(store: Store) -> Self {
        Self {
            store,
            subscriptions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Returns the registry holding the event descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Detached`] if the registry has been dropped.
    pub fn registry(&self) -> Result<Registry, EventError> {
        match &self.store {
            Store::Owned(registry) => Ok(registry.clone()),
            Store::Attached(weak) => weak.upgrade().ok_or(EventError::Detached),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers an event, replacing any event already at `label`.
    ///
    /// Returns the new event. See the [module documentation](self) for what
    /// happens to subscribers of a replaced event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Detached`] if the backing registry is gone.
    pub fn register(
        &self,
        label: impl Into<String>,
        priority: impl Into<Priority>,
        attrs: Map<String, Value>,
    ) -> Result<Arc<Event>, EventError> {
        let registry = self.registry()?;
        let event = Arc::new(Event::new(label.into(), priority.into(), attrs));
        let previous = registry.set::<Events>(event.label(), Component::from_arc(Arc::clone(&event)));

        if previous.is_some() {
            tracing::debug!(
                event = event.label(),
                id = %event.id(),
                "re-registered event; subscribers of the previous registration are orphaned"
            );
        } else {
            tracing::debug!(
                event = event.label(),
                id = %event.id(),
                priority = %event.priority(),
                "registered event"
            );
        }
        Ok(event)
    }

    /// Removes the event at `label` and returns it.
    ///
    /// Bound subscribers are not unbound first; they become orphaned.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Detached`] if the backing registry is gone.
    pub fn unregister(&self, label: &str) -> Result<Option<Arc<Event>>, EventError> {
        let removed = self.registry()?.remove::<Events>(label);
        tracing::debug!(event = label, removed = removed.is_some(), "unregistered event");
        Ok(removed.and_then(|entry| match entry {
            Entry::Component(component) => component.downcast::<Event>(),
            Entry::Branch(_) | Entry::Deferred(_) => None,
        }))
    }

    /// Returns the event registered at `label`.
    ///
    /// # Errors
    ///
    /// - [`EventError::NotFound`] if no event is registered at `label`
    /// - [`EventError::Registry`] if the slot holds something other than an event
    pub fn event(&self, label: &str) -> Result<Arc<Event>, EventError> {
        let resolved = self.registry()?.get::<Events>(label).map_err(|err| match err {
            RegistryError::NotFound { .. } => EventError::NotFound(label.to_string()),
            other => EventError::Registry(other),
        })?;
        let found = resolved.describe();
        resolved
            .into_component()
            .and_then(|component| component.downcast::<Event>())
            .ok_or_else(|| {
                EventError::Registry(RegistryError::TypeMismatch {
                    label: label.to_string(),
                    expected: core::any::type_name::<Event>(),
                    found,
                })
            })
    }

    /// Returns `true` if an event is registered at `label`.
    #[must_use]
    pub fn is_registered(&self, label: &str) -> bool {
        self.event(label).is_ok()
    }

    /// Returns the labels of all registered events, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Detached`] if the backing registry is gone.
    pub fn labels(&self) -> Result<Vec<String>, EventError> {
        Ok(self.registry()?.labels::<Events>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding
    // ─────────────────────────────────────────────────────────────────────────

    /// Binds `subscriber` to the event at `label`.
    ///
    /// Returns `false` if the subscriber was already bound, in which case its
    /// position is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotFound`] if no event is registered at `label`.
    pub fn bind(&self, label: &str, subscriber: Subscriber) -> Result<bool, EventError> {
        let event = self.event(label)?;
        let mut subscriptions = self.subscriptions.write();
        let bound = subscriptions.entry(event.id().clone()).or_default();

        if bound.iter().any(|sub| sub.subscriber.ptr_eq(&subscriber)) {
            return Ok(false);
        }

        tracing::debug!(event = label, subscriber = subscriber.name(), "bound subscriber");
        bound.push(Subscription {
            subscriber,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        });
        Ok(true)
    }

    /// Unbinds `subscriber` from the event at `label`.
    ///
    /// Returns `false` if it was not bound.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotFound`] if no event is registered at `label`.
    pub fn unbind(&self, label: &str, subscriber: &Subscriber) -> Result<bool, EventError> {
        let event = self.event(label)?;
        let mut subscriptions = self.subscriptions.write();
        let Some(bound) = subscriptions.get_mut(event.id()) else {
            return Ok(false);
        };

        let before = bound.len();
        bound.retain(|sub| !sub.subscriber.ptr_eq(subscriber));
        let removed = bound.len() != before;
        if bound.is_empty() {
            subscriptions.remove(event.id());
        }

        if removed {
            tracing::debug!(event = label, subscriber = subscriber.name(), "unbound subscriber");
        }
        Ok(removed)
    }

    /// Returns the number of subscribers bound to the event at `label`, or
    /// zero if it is not registered.
    #[must_use]
    pub fn subscriber_count(&self, label: &str) -> usize {
        let Ok(event) = self.event(label) else {
            return 0;
        };
        self.subscriptions
            .read()
            .get(event.id())
            .map_or(0, Vec::len)
    }

    /// Drops subscriber lists whose event is no longer registered.
    ///
    /// Returns how many subscriptions were released.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Detached`] if the backing registry is gone.
    pub fn prune_orphans(&self) -> Result<usize, EventError> {
        let live: Vec<EventId> = self
            .labels()?
            .iter()
            .filter_map(|label| self.event(label).ok())
            .map(|event| event.id().clone())
            .collect();

        let mut subscriptions = self.subscriptions.write();
        let mut released = 0;
        subscriptions.retain(|id, bound| {
            let keep = live.contains(id);
            if !keep {
                released += bound.len();
            }
            keep
        });

        tracing::debug!(released, "pruned orphaned subscriptions");
        Ok(released)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the subscribers of the event at `label`, in dispatch order.
    ///
    /// The result is a fresh copy; consuming it does not affect the bindings.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotFound`] if no event is registered at `label`.
    pub fn react(&self, label: &str) -> Result<Vec<Subscriber>, EventError> {
        self.react_many([label])
    }

    /// Returns the subscribers of several events merged into one dispatch
    /// order: ascending event priority, then bind order.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotFound`] for the first label that is not registered.
    pub fn react_many<'a>(
        &self,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Subscriber>, EventError> {
        let events = labels
            .into_iter()
            .map(|label| self.event(label))
            .collect::<Result<Vec<_>, _>>()?;

        let subscriptions = self.subscriptions.read();
        let mut ordered: Vec<(Priority, u64, Subscriber)> = events
            .iter()
            .flat_map(|event| {
                subscriptions
                    .get(event.id())
                    .into_iter()
                    .flatten()
                    .map(|sub| (event.priority(), sub.seq, sub.subscriber.clone()))
            })
            .collect();
        drop(subscriptions);

        ordered.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        Ok(ordered.into_iter().map(|(_, _, subscriber)| subscriber).collect())
    }

    /// Calls every subscriber of the event at `label` with `call`, in
    /// dispatch order, and returns their results.
    ///
    /// Works on a drained copy of [`react`](Self::react); the bindings are
    /// untouched. A disabled manager returns an empty result without calling
    /// anything.
    ///
    /// # Errors
    ///
    /// - [`EventError::NotFound`] if no event is registered at `label`
    /// - [`EventError::Handler`] if a subscriber fails; later subscribers are
    ///   not called
    pub fn fire(&self, label: &str, call: &Call) -> Result<Vec<Value>, EventError> {
        if !self.is_enabled() {
            tracing::trace!(event = label, "manager disabled; fire skipped");
            return Ok(Vec::new());
        }

        let mut pending: VecDeque<Subscriber> = self.react(label)?.into();
        tracing::debug!(event = label, subscribers = pending.len(), "firing event");

        let mut results = Vec::with_capacity(pending.len());
        while let Some(subscriber) = pending.pop_front() {
            results.push(invoke(label, &subscriber, call)?);
        }
        Ok(results)
    }

    /// Replays one queued call per subscriber of the event at `label`.
    ///
    /// The first queued call goes to the first subscriber in dispatch order,
    /// the second to the second, and so on. The queue length is checked
    /// before any subscriber is called. A disabled manager validates the
    /// length and then returns an empty result.
    ///
    /// # Errors
    ///
    /// - [`EventError::NotFound`] if no event is registered at `label`
    /// - [`EventError::LengthMismatch`] if `queue` is not exactly one call per
    ///   subscriber
    /// - [`EventError::Handler`] if a subscriber fails; later subscribers are
    ///   not called
    pub fn burst(&self, label: &str, mut queue: VecDeque<Call>) -> Result<Vec<Value>, EventError> {
        let mut pending: VecDeque<Subscriber> = self.react(label)?.into();
        if pending.len() != queue.len() {
            return Err(EventError::LengthMismatch {
                label: label.to_string(),
                subscribers: pending.len(),
                queued: queue.len(),
            });
        }
        if !self.is_enabled() {
            tracing::trace!(event = label, "manager disabled; burst skipped");
            return Ok(Vec::new());
        }

        tracing::debug!(event = label, subscribers = pending.len(), "bursting event");
        let mut results = Vec::with_capacity(pending.len());
        while let (Some(subscriber), Some(call)) = (pending.pop_front(), queue.pop_front()) {
            results.push(invoke(label, &subscriber, &call)?);
        }
        Ok(results)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Switch
    // ─────────────────────────────────────────────────────────────────────────

    /// Resumes dispatch.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Suspends dispatch: `fire` and `burst` call nothing until re-enabled.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Returns `true` unless [`disable`](Self::disable) is in effect.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

fn invoke(label: &str, subscriber: &Subscriber, call: &Call) -> Result<Value, EventError> {
    subscriber.call(call).map_err(|source| {
        tracing::debug!(event = label, subscriber = subscriber.name(), error = %source, "subscriber failed");
        EventError::Handler {
            label: label.to_string(),
            subscriber: subscriber.name().to_string(),
            source,
        }
    })
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = match &self.store {
            Store::Owned(_) => "owned",
            Store::Attached(_) => "attached",
        };
        f.debug_struct("EventManager")
            .field("store", &store)
            .field("bound_events", &self.subscriptions.read().len())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn constant(name: &str, value: i64) -> Subscriber {
        Subscriber::from_fn(name.to_string(), move |_: &Call| value)
    }

    fn manager_with(label: &str, priority: i64) -> EventManager {
        let events = EventManager::new();
        events.register(label, priority, Map::new()).unwrap();
        events
    }

    #[test]
    fn register_stores_event_in_registry() {
        let events = EventManager::new();
        let mut attrs = Map::new();
        attrs.insert("doc".into(), json!("emitted after save"));
        let event = events.register("saved", 5, attrs).unwrap();

        assert_eq!(event.priority(), Priority(5));
        assert_eq!(event.attr("doc"), Some(&json!("emitted after save")));
        assert!(events.registry().unwrap().contains_key::<Events>("saved"));
        assert_eq!(events.event("saved").unwrap().id(), event.id());
    }

    #[test]
    fn bind_requires_registered_event() {
        let events = EventManager::new();
        let err = events.bind("missing", constant("a", 1)).unwrap_err();
        assert!(matches!(err, EventError::NotFound(label) if label == "missing"));
        assert!(matches!(
            events.unbind("missing", &constant("a", 1)),
            Err(EventError::NotFound(_))
        ));
    }

    #[test]
    fn bind_is_idempotent_per_subscriber() {
        let events = manager_with("e", 1);
        let sub = constant("a", 1);

        assert!(events.bind("e", sub.clone()).unwrap());
        assert!(!events.bind("e", sub.clone()).unwrap());
        assert_eq!(events.subscriber_count("e"), 1);
    }

    #[test]
    fn unbind_removes_only_that_subscriber() {
        let events = manager_with("e", 1);
        let a = constant("a", 1);
        let b = constant("b", 2);
        events.bind("e", a.clone()).unwrap();
        events.bind("e", b.clone()).unwrap();

        assert!(events.unbind("e", &a).unwrap());
        assert!(!events.unbind("e", &a).unwrap());
        assert_eq!(events.react("e").unwrap(), vec![b]);
    }

    #[test]
    fn fire_drains_a_copy() {
        let events = manager_with("e", 1);
        let f = constant("f", 1);
        let g = constant("g", 2);
        events.bind("e", f.clone()).unwrap();
        events.bind("e", g.clone()).unwrap();

        assert_eq!(events.fire("e", &Call::new()).unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(events.react("e").unwrap(), vec![f, g]);
        assert_eq!(events.fire("e", &Call::new()).unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn fire_passes_arguments() {
        let events = manager_with("greet", 1);
        events
            .bind(
                "greet",
                Subscriber::from_fn("hello", |call: &Call| {
                    let name = call.arg_at(0).and_then(Value::as_str).unwrap_or("?");
                    let punct = call.kwarg_value("punct").and_then(Value::as_str).unwrap_or("");
                    format!("hello {name}{punct}")
                }),
            )
            .unwrap();

        let results = events
            .fire("greet", &Call::new().arg("ada").kwarg("punct", "!"))
            .unwrap();
        assert_eq!(results, vec![json!("hello ada!")]);
    }

    #[test]
    fn fire_stops_at_first_failure() {
        let events = manager_with("e", 1);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        events.bind("e", Subscriber::new("bad", |_: &Call| Err("nope".into()))).unwrap();
        events
            .bind(
                "e",
                Subscriber::from_fn("after", move |_: &Call| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Value::Null
                }),
            )
            .unwrap();

        let err = events.fire("e", &Call::new()).unwrap_err();
        assert!(matches!(err, EventError::Handler { ref subscriber, .. } if subscriber == "bad"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn burst_pairs_calls_with_subscribers() {
        let events = manager_with("e", 1);
        let echo = |name: &str| {
            Subscriber::from_fn(name.to_string(), |call: &Call| call.arg_at(0).cloned())
        };
        events.bind("e", echo("first")).unwrap();
        events.bind("e", echo("second")).unwrap();

        let queue = VecDeque::from([Call::new().arg("a"), Call::new().arg("b")]);
        assert_eq!(events.burst("e", queue).unwrap(), vec![json!("a"), json!("b")]);
    }

    #[test]
    fn burst_length_mismatch_invokes_nothing() {
        let events = manager_with("e", 1);
        let calls = Arc::new(AtomicUsize::new(0));
        for name in ["a", "b"] {
            let counter = Arc::clone(&calls);
            events
                .bind(
                    "e",
                    Subscriber::from_fn(name, move |_: &Call| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Value::Null
                    }),
                )
                .unwrap();
        }

        for size in [0, 1, 3] {
            let queue: VecDeque<Call> = (0..size).map(|_| Call::new()).collect();
            let err = events.burst("e", queue).unwrap_err();
            assert!(matches!(
                err,
                EventError::LengthMismatch { subscribers: 2, queued, .. } if queued == size
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disabled_manager_short_circuits_dispatch() {
        let events = manager_with("e", 1);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&calls);
        events
            .bind(
                "e",
                Subscriber::from_fn("log", move |_: &Call| {
                    log.lock().unwrap().push(());
                    Value::Null
                }),
            )
            .unwrap();

        events.disable();
        assert!(events.fire("e", &Call::new()).unwrap().is_empty());
        assert!(matches!(
            events.burst("e", VecDeque::new()),
            Err(EventError::LengthMismatch { .. })
        ));
        assert!(events.burst("e", VecDeque::from([Call::new()])).unwrap().is_empty());
        assert!(calls.lock().unwrap().is_empty());

        events.enable();
        assert_eq!(events.fire("e", &Call::new()).unwrap().len(), 1);
    }

    #[test]
    fn reregistering_orphans_subscribers() {
        let events = manager_with("e", 1);
        events.bind("e", constant("old", 1)).unwrap();
        let old_id = events.event("e").unwrap().id().clone();

        let fresh = events.register("e", 1, Map::new()).unwrap();
        assert_ne!(fresh.id(), &old_id);
        assert!(events.react("e").unwrap().is_empty());
        assert_eq!(events.prune_orphans().unwrap(), 1);
    }

    #[test]
    fn unregister_leaves_bindings_orphaned() {
        let events = manager_with("e", 1);
        events.bind("e", constant("a", 1)).unwrap();

        let removed = events.unregister("e").unwrap().unwrap();
        assert_eq!(removed.label(), "e");
        assert!(!events.is_registered("e"));
        assert!(matches!(events.react("e"), Err(EventError::NotFound(_))));
        assert_eq!(events.unregister("e").unwrap().map(|e| e.id().clone()), None);
        assert_eq!(events.prune_orphans().unwrap(), 1);
    }

    #[test]
    fn attached_manager_detaches_when_registry_drops() {
        let registry = Registry::new();
        let events = EventManager::attached_to(&registry);
        events.register("e", 1, Map::new()).unwrap();
        assert!(registry.contains_key::<Events>("e"));

        drop(registry);
        assert!(matches!(events.register("f", 1, Map::new()), Err(EventError::Detached)));
    }
}
