//! Layered settings attached to a registry.
//!
//! Settings hold three tiers of string-keyed values:
//!
//! | Tier | Written by | Precedence |
//! |------|------------|------------|
//! | defaults | [`Settings::set_default`], [`Settings::extend_defaults_from`] | lowest |
//! | assigned | [`Settings::set`] | middle |
//! | required | [`Settings::set_required`] | highest |
//!
//! Reads see the *final* view: defaults, overlaid by assigned values,
//! overlaid by required values. Nested tables merge key by key; any other
//! value replaces what is beneath it.
//!
//! Keys are dotted paths into nested tables: `"db.pool.size"` addresses
//! `{"db": {"pool": {"size": ..}}}`.
//!
//! Once [`lock`](Settings::lock)ed, every write fails with
//! [`SettingsError::Locked`].
//!
//! # Example
//!
//! ```
//! use plexus_registry::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::new();
//! let settings = registry.settings();
//!
//! settings.set_default("db.pool.size", 4).unwrap();
//! settings.set("db.pool.size", 8).unwrap();
//! settings.set_required("db.url", "postgres://localhost").unwrap();
//!
//! assert_eq!(settings.get("db.pool.size"), Some(json!(8)));
//! assert_eq!(settings.get_as::<u32>("db.pool.size").unwrap(), 8);
//!
//! settings.lock();
//! assert!(settings.set("db.pool.size", 16).is_err());
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::SettingsError;
use crate::registry::Registry;
use crate::service::Service;

#[derive(Debug, Default)]
struct Tiers {
    defaults: Map<String, Value>,
    assigned: Map<String, Value>,
    required: Map<String, Value>,
}

#[derive(Clone, Copy)]
enum Tier {
    Default,
    Assigned,
    Required,
}

/// Layered key/value settings. See the [module documentation](self).
#[derive(Debug, Default)]
pub struct Settings {
    tiers: RwLock<Tiers>,
    locked: AtomicBool,
}

impl Service for Settings {}

impl Settings {
    /// Creates empty, unlocked settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the final value at `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let segments = split_key(key).ok()?;
        let view = self.final_view();
        lookup(&view, &segments).cloned()
    }

    /// Returns the final value at `key`, or `default` if unset.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Returns the final value at `key` deserialized as `T`.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::Missing`] if no tier sets `key`
    /// - [`SettingsError::Serde`] if the value does not deserialize as `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        let value = self
            .get(key)
            .ok_or_else(|| SettingsError::Missing(key.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sets a value in the assigned tier, returning the previous assigned value.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::Locked`] once the settings are locked
    /// - [`SettingsError::InvalidKey`] for an empty key or segment
    /// - [`SettingsError::NotATable`] if a prefix of `key` holds a non-table
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<Option<Value>, SettingsError> {
        self.write(Tier::Assigned, key, value.into())
    }

    /// Sets a value in the defaults tier.
    ///
    /// # Errors
    ///
    /// See [`set`](Self::set).
    pub fn set_default(
        &self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        self.write(Tier::Default, key, value.into())
    }

    /// Sets a value in the required tier. Required values override every
    /// other tier.
    ///
    /// # Errors
    ///
    /// See [`set`](Self::set).
    pub fn set_required(
        &self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        self.write(Tier::Required, key, value.into())
    }

    /// Deep-merges a serializable value into the defaults tier.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::Locked`] once the settings are locked
    /// - [`SettingsError::Serde`] if `value` fails to serialize
    /// - [`SettingsError::NotATable`] if `value` does not serialize to a map
    pub fn extend_defaults_from<T: Serialize>(&self, value: &T) -> Result<(), SettingsError> {
        if self.is_locked() {
            return Err(SettingsError::Locked {
                key: String::new(),
            });
        }
        let Value::Object(table) = serde_json::to_value(value)? else {
            return Err(SettingsError::NotATable {
                key: core::any::type_name::<T>().to_string(),
            });
        };
        merge_into(&mut self.tiers.write().defaults, table);
        Ok(())
    }

    /// Returns defaults ⊕ assigned ⊕ required as one table.
    #[must_use]
    pub fn final_view(&self) -> Map<String, Value> {
        let tiers = self.tiers.read();
        let mut view = tiers.defaults.clone();
        merge_into(&mut view, tiers.assigned.clone());
        merge_into(&mut view, tiers.required.clone());
        view
    }

    /// Rejects every later write.
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
        tracing::debug!("settings locked");
    }

    /// Returns `true` once [`lock`](Self::lock) has been called.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn write(&self, tier: Tier, key: &str, value: Value) -> Result<Option<Value>, SettingsError> {
        if self.is_locked() {
            return Err(SettingsError::Locked {
                key: key.to_string(),
            });
        }
        let segments = split_key(key)?;
        let mut tiers = self.tiers.write();
        let table = match tier {
            Tier::Default => &mut tiers.defaults,
            Tier::Assigned => &mut tiers.assigned,
            Tier::Required => &mut tiers.required,
        };
        insert(table, &segments, value)
    }
}

impl Registry {
    /// Returns the settings attached to this registry node, creating them on
    /// first use.
    pub fn settings(&self) -> Arc<Settings> {
        self.service_or_init(|_| Settings::new())
    }
}

fn split_key(key: &str) -> Result<Vec<&str>, SettingsError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(SettingsError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

fn lookup<'a>(table: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (last, parents) = segments.split_last()?;
    let mut current = table;
    for segment in parents {
        current = current.get(*segment)?.as_object()?;
    }
    current.get(*last)
}

fn insert(
    table: &mut Map<String, Value>,
    segments: &[&str],
    value: Value,
) -> Result<Option<Value>, SettingsError> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(SettingsError::InvalidKey(String::new()));
    };
    let mut current = table;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = slot.as_object_mut().ok_or_else(|| SettingsError::NotATable {
            key: segments[..=depth].join("."),
        })?;
    }
    Ok(current.insert((*last).to_string(), value))
}

/// Overlays `upper` onto `base`, merging nested tables.
fn merge_into(base: &mut Map<String, Value>, upper: Map<String, Value>) {
    for (key, value) in upper {
        if let Value::Object(higher) = value {
            if let Some(Value::Object(lower)) = base.get_mut(&key) {
                merge_into(lower, higher);
            } else {
                base.insert(key, Value::Object(higher));
            }
        } else {
            base.insert(key, value);
        }
    }
}
