//! The hierarchical component registry for Plexus (Layer 1).
//!
//! `plexus_registry` stores components under `(tag, label)` keys and nests
//! registries inside each other to form a namespace tree:
//!
//! - [`tag`] - Capability tags that partition a registry's keys
//! - [`Registry`] - The `(tag, label) → entry` store and its branches
//! - [`Entry`] / [`Resolved`] - What a slot holds and what a lookup returns
//! - [`locator`] - Named modules that deferred references point into
//! - [`Resolver`] - Turns deferred references into components and branches
//! - [`Settings`] - Layered defaults, assigned, and required values
//! - [`Namespace`] - Declarative bootstrap of a branch
//! - [`global()`] - The process-wide default registry
//!
//! # Deferred resolution
//!
//! Storing a string registers an import path rather than a value. The first
//! lookup resolves the path through the registry's [`Locator`](locator::Locator)
//! and replaces the entry in place, so every later lookup returns the same
//! object.
//!
//! ```
//! use plexus_registry::prelude::*;
//!
//! let registry = Registry::new();
//! registry.set::<Apps>("sqrt", "math.sqrt");
//! assert!(registry.peek::<Apps>("sqrt").unwrap().is_deferred());
//!
//! let sqrt = registry.component::<fn(f64) -> f64>("sqrt").unwrap();
//! assert_eq!(sqrt(4.0), 2.0);
//! assert!(!registry.peek::<Apps>("sqrt").unwrap().is_deferred());
//! ```
//!
//! # Architecture
//!
//! - **Layer 0** (`plexus_memo`): bounded LRU memoization
//! - **Layer 1** (`plexus_registry`): registry tree and resolution (this crate)
//! - **Layer 2** (`plexus_events`): prioritized events over a registry
//! - **Layer 3** (`plexus_diagnostics`): tracing setup as a namespace

mod component;
mod entry;
mod error;
mod global;
mod namespace;
mod registry;
mod resolver;
mod service;
mod settings;

/// Named modules and the [`Locator`](locator::Locator) trait.
pub mod locator;

/// Capability tags.
pub mod tag;

pub use component::Component;
pub use entry::{DEFAULT_INCLUDE_ATTR, DeferredRef, Entry, Resolved};
pub use error::{RegistryError, ResolveError, SettingsError};
#[cfg(any(test, feature = "test-utils"))]
pub use global::reset_global;
pub use global::{GLOBAL_ROOT_LABEL, global};
pub use namespace::Namespace;
pub use registry::{Registry, RegistryConfig, WeakRegistry};
pub use resolver::{DEFAULT_RESOLVE_CACHE_SIZE, Resolver};
pub use service::Service;
pub use settings::Settings;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::locator::{Attr, Locator, Module, ModuleTable};
    pub use crate::tag::{Apps, Events, Tag, TagId};
    pub use crate::{
        Component, DeferredRef, Entry, Namespace, Registry, RegistryConfig, RegistryError,
        ResolveError, Resolved, Resolver, Service, Settings, SettingsError, global,
    };
}
