//! Tracing setup for Plexus (Layer 3).
//!
//! The registry crates only emit `tracing` events; they never install a
//! subscriber. [`TracingNamespace`] is the piece host applications add to
//! their registry to turn those events into output.
//!
//! ```
//! use plexus_diagnostics::{TracingConfig, TracingFormat, TracingNamespace};
//! use plexus_registry::Registry;
//! use tracing::Level;
//!
//! let registry = Registry::new();
//! let branch = registry
//!     .add_namespace(
//!         &TracingNamespace::new()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact)
//!             .installing(false),
//!     )
//!     .unwrap();
//!
//! let config = branch.component::<TracingConfig>("config").unwrap();
//! assert_eq!(config.level, Level::DEBUG);
//! ```

mod tracing_namespace;

pub use tracing_namespace::{DEFAULT_LABEL, TracingConfig, TracingFormat, TracingNamespace};
