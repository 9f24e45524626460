//! A hierarchical component registry for Rust.
//!
//! Plexus stores components under `(tag, label)` keys in a tree of
//! registries, resolves string references to components on first use,
//! dispatches prioritized events, and memoizes hot lookups.
//!
//! ```
//! use plexus::prelude::*;
//! use serde_json::{Map, json};
//!
//! let app = Registry::new();
//! app.set::<Apps>("sqrt", "math.sqrt");
//!
//! let events = app.events();
//! events.register("computed", 1, Map::new())?;
//! // The subscriber lives inside `app`, so it holds only a weak handle.
//! let registry = app.downgrade();
//! events.bind(
//!     "computed",
//!     Subscriber::from_fn("sqrt", move |call: &Call| {
//!         let x = call.arg_at(0).and_then(|v| v.as_f64()).unwrap_or(0.0);
//!         registry
//!             .upgrade()
//!             .and_then(|app| app.component::<fn(f64) -> f64>("sqrt").ok())
//!             .map_or(f64::NAN, |sqrt| sqrt(x))
//!     }),
//! )?;
//!
//! assert_eq!(events.fire("computed", &Call::new().arg(9.0))?, vec![json!(3.0)]);
//! # Ok::<(), plexus::plexus_events::EventError>(())
//! ```

pub use plexus_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use plexus_internal::prelude::*;
}
