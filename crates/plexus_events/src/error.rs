//! Error types for event dispatch.

use plexus_registry::RegistryError;

use crate::subscriber::HandlerError;

/// Errors returned by [`EventManager`](crate::EventManager) operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// No event is registered under the label.
    #[error("no event registered as '{0}'")]
    NotFound(String),

    /// A burst queue does not pair one call with each subscriber.
    #[error("event '{label}' has {subscribers} subscriber(s) but {queued} queued call(s)")]
    LengthMismatch {
        /// The event being burst.
        label: String,
        /// Number of subscribers `react` returned.
        subscribers: usize,
        /// Number of queued calls.
        queued: usize,
    },

    /// A subscriber returned an error. Dispatch stopped at that subscriber.
    #[error("subscriber '{subscriber}' of event '{label}' failed")]
    Handler {
        /// The event being dispatched.
        label: String,
        /// Name of the failing subscriber.
        subscriber: String,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },

    /// The registry holding the events has been dropped.
    #[error("the registry backing this event manager no longer exists")]
    Detached,

    /// The registry rejected an operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
