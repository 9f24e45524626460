//! The process-wide default registry.
//!
//! Most code should pass a [`Registry`] explicitly. Host applications that
//! want one ambient registry use [`global`], which constructs it on first use
//! with the root label `global` and returns a handle to the same store on
//! every call.
//!
//! ```
//! use plexus_registry::global;
//!
//! let first = global();
//! let second = global();
//! assert!(first.ptr_eq(&second));
//! assert_eq!(first.root_label(), "global");
//! ```

use parking_lot::RwLock;

use crate::registry::{Registry, RegistryConfig};

/// Root label of the global registry.
pub const GLOBAL_ROOT_LABEL: &str = "global";

static GLOBAL: RwLock<Option<Registry>> = parking_lot::const_rwlock(None);

/// Returns the global registry, constructing it on first use.
pub fn global() -> Registry {
    if let Some(registry) = GLOBAL.read().as_ref() {
        return registry.clone();
    }
    GLOBAL
        .write()
        .get_or_insert_with(|| {
            tracing::debug!("initializing global registry");
            Registry::with_config(RegistryConfig::default().with_root_label(GLOBAL_ROOT_LABEL))
        })
        .clone()
}

/// Drops the global registry so the next [`global`] call builds a fresh one.
///
/// Handles obtained before the reset keep the old store alive.
#[cfg(any(test, feature = "test-utils"))]
pub fn reset_global() {
    GLOBAL.write().take();
}
