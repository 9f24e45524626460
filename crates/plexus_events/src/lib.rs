//! Prioritized events for Plexus (Layer 2).
//!
//! `plexus_events` layers event registration and dispatch over a
//! [`plexus_registry::Registry`]. Events are registry entries under the
//! [`Events`](plexus_registry::tag::Events) tag; subscribers are callables
//! bound to an event's identity.
//!
//! - [`EventManager`] - Register, bind, and dispatch
//! - [`Event`] / [`Priority`] - Event descriptors and their ordering key
//! - [`Subscriber`] / [`Call`] - Bound callables and their arguments
//! - [`RegistryEventsExt`] - Per-registry managers
//!
//! # Dispatch modes
//!
//! | Mode | Arguments | Result |
//! |------|-----------|--------|
//! | [`react`](EventManager::react) | none | subscribers in dispatch order |
//! | [`fire`](EventManager::fire) | one [`Call`] for every subscriber | one value per subscriber |
//! | [`burst`](EventManager::burst) | one queued [`Call`] per subscriber | one value per subscriber |

mod error;
mod event;
mod ext;
mod manager;
mod subscriber;

pub use error::EventError;
pub use event::{Event, EventId, Priority};
pub use ext::RegistryEventsExt;
pub use manager::EventManager;
pub use subscriber::{Call, HandlerError, Subscriber};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{
        Call, Event, EventError, EventId, EventManager, HandlerError, Priority,
        RegistryEventsExt, Subscriber,
    };
}
