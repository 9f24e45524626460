//! Attaching an event manager to a registry.

use std::sync::Arc;

use plexus_registry::Registry;

use crate::manager::EventManager;

/// Extension trait giving every [`Registry`] node its own [`EventManager`].
///
/// ```
/// use plexus_events::{Call, RegistryEventsExt, Subscriber};
/// use plexus_registry::Registry;
/// use plexus_registry::tag::Events;
/// use serde_json::Map;
///
/// let registry = Registry::new();
/// registry.events().register("booted", 1, Map::new())?;
/// registry.events().bind("booted", Subscriber::from_fn("ok", |_: &Call| true))?;
///
/// assert!(registry.contains_key::<Events>("booted"));
/// assert_eq!(registry.events().fire("booted", &Call::new())?.len(), 1);
/// # Ok::<(), plexus_events::EventError>(())
/// ```
pub trait RegistryEventsExt {
    /// Returns this node's event manager, creating it on first use.
    ///
    /// Events are stored in this registry under the
    /// [`Events`](plexus_registry::tag::Events) tag.
    fn events(&self) -> Arc<EventManager>;
}

impl RegistryEventsExt for Registry {
    fn events(&self) -> Arc<EventManager> {
        self.service_or_init(EventManager::attached_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn events_are_per_node_and_shared_by_clones() {
        let registry = Registry::new();
        let branch = registry.branch("child").unwrap();

        assert!(Arc::ptr_eq(&registry.events(), &registry.clone().events()));
        assert!(!Arc::ptr_eq(&registry.events(), &branch.events()));

        registry.events().register("e", 1, Map::new()).unwrap();
        assert!(!branch.events().is_registered("e"));
    }

    #[test]
    fn attached_manager_does_not_keep_registry_alive() {
        let registry = Registry::new();
        let events = registry.events();
        let weak = registry.downgrade();

        drop(registry);
        assert!(weak.upgrade().is_none());
        assert!(events.registry().is_err());
    }
}
