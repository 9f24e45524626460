//! Per-node services.
//!
//! A service is a value attached to one registry node and keyed by its type.
//! Services are how subsystems hang state off a registry without claiming a
//! label: the settings store and the event manager are both services.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use plexus_registry::{Registry, Service};
//!
//! #[derive(Default)]
//! struct Hits(AtomicUsize);
//!
//! impl Service for Hits {}
//!
//! let registry = Registry::new();
//! registry.service_or_init(|_| Hits::default()).0.fetch_add(1, Ordering::Relaxed);
//! assert_eq!(registry.service::<Hits>().unwrap().0.load(Ordering::Relaxed), 1);
//! ```
//!
//! Services are shared behind an `Arc` and must use interior mutability for
//! any state they change after construction.

/// Marker for types that can be attached to a [`Registry`](crate::Registry)
/// with [`service_or_init`](crate::Registry::service_or_init).
pub trait Service: Send + Sync + 'static {}
