//! Event descriptors.

use core::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// EventId
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of one event registration: the label plus a random nonce.
///
/// Every call to [`EventManager::register`](crate::EventManager::register)
/// mints a fresh id, so re-registering a label produces a different id even
/// when the label, priority, and attributes are unchanged. Subscriptions are
/// keyed by this id, which is how a re-registration drops them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId {
    label: Arc<str>,
    nonce: Arc<str>,
}

impl EventId {
    fn mint(label: &str) -> Self {
        Self {
            label: label.into(),
            nonce: nanoid::nanoid!(10).into(),
        }
    }

    /// Returns the label this id was minted for.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.nonce)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Priority
// ─────────────────────────────────────────────────────────────────────────────

/// Ordering key for an event's subscribers. Lower values run first.
///
/// Priority belongs to the event, not to individual subscribers: all
/// subscribers of one event share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i64);

impl Priority {
    /// The priority events get when none is given.
    pub const DEFAULT: Priority = Priority(1);
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(i64::from(value))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// A registered event: its identity, label, priority, and free-form
/// attributes captured at registration.
#[derive(Debug, Clone)]
pub struct Event {
    id: EventId,
    label: String,
    priority: Priority,
    attrs: Map<String, Value>,
}

impl Event {
    pub(crate) fn new(label: String, priority: Priority, attrs: Map<String, Value>) -> Self {
        Self {
            id: EventId::mint(&label),
            label,
            priority,
            attrs,
        }
    }

    /// Returns this registration's identity.
    #[must_use]
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Returns the label the event is registered under.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the event's priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Returns one attribute.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }
}
