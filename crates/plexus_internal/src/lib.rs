//! # Plexus Internal Library
//!
//! Re-exports the core Plexus crates for convenience.

/// Layer 0: Bounded memoization.
pub use plexus_memo;

/// Layer 1: Registry tree and deferred resolution.
pub use plexus_registry;

/// Layer 2: Prioritized events.
pub use plexus_events;

/// Layer 3: Tracing setup.
pub use plexus_diagnostics;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use plexus_diagnostics::{TracingConfig, TracingFormat, TracingNamespace};
    pub use plexus_events::prelude::*;
    pub use plexus_memo::{CallKey, Memoizer, memoize};
    pub use plexus_registry::prelude::*;
}
