//! Declarative bootstrap units for branches.
//!
//! A [`Namespace`] describes how to populate one branch. Host code adds
//! namespaces to a registry at startup instead of wiring branches by hand:
//!
//! ```
//! use plexus_registry::{Namespace, Registry, RegistryError};
//! use plexus_registry::tag::Apps;
//!
//! struct Geometry;
//!
//! impl Namespace for Geometry {
//!     fn label(&self) -> &str {
//!         "geometry"
//!     }
//!
//!     fn build(&self, registry: &Registry) -> Result<(), RegistryError> {
//!         registry.set::<Apps>("sqrt", "math.sqrt");
//!         registry.settings().set_default("precision", 6).ok();
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::new();
//! let geometry = registry.add_namespace(&Geometry).unwrap();
//!
//! assert!(geometry.contains("sqrt"));
//! assert!(registry.lookup("geometry.sqrt").is_ok());
//! ```

use crate::error::RegistryError;
use crate::registry::Registry;

/// Populates the branch labelled [`label`](Namespace::label).
pub trait Namespace: Send + Sync {
    /// Label of the branch this namespace builds. Must not contain `.`.
    fn label(&self) -> &str;

    /// Registers this namespace's entries into its branch.
    ///
    /// # Errors
    ///
    /// Any error stops the bootstrap and is returned from
    /// [`Registry::add_namespace`].
    fn build(&self, registry: &Registry) -> Result<(), RegistryError>;
}

impl Registry {
    /// Get-or-creates the branch at `namespace.label()` and builds it.
    ///
    /// Adding two namespaces with the same label builds both into one
    /// branch; later entries overwrite earlier ones.
    ///
    /// # Errors
    ///
    /// Returns the error from [`branch`](Registry::branch) or from
    /// [`Namespace::build`].
    pub fn add_namespace<N: Namespace + ?Sized>(&self, namespace: &N) -> Result<Registry, RegistryError> {
        let branch = self.branch(namespace.label())?;
        tracing::debug!(
            registry = %self.path(),
            namespace = namespace.label(),
            "building namespace"
        );
        namespace.build(&branch)?;
        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::tag::Apps;

    struct Fixed {
        label: &'static str,
        value: u32,
    }

    impl Namespace for Fixed {
        fn label(&self) -> &str {
            self.label
        }

        fn build(&self, registry: &Registry) -> Result<(), RegistryError> {
            registry.set::<Apps>("value", Component::new(self.value));
            Ok(())
        }
    }

    struct Failing;

    impl Namespace for Failing {
        fn label(&self) -> &str {
            "failing"
        }

        fn build(&self, _registry: &Registry) -> Result<(), RegistryError> {
            Err(RegistryError::configuration("missing dependency"))
        }
    }

    #[test]
    fn add_namespace_builds_branch() {
        let registry = Registry::new();
        let branch = registry.add_namespace(&Fixed { label: "a", value: 1 }).unwrap();

        assert!(branch.ptr_eq(&registry.branch("a").unwrap()));
        assert_eq!(*branch.component::<u32>("value").unwrap(), 1);
    }

    #[test]
    fn same_label_shares_branch() {
        let registry = Registry::new();
        registry.add_namespace(&Fixed { label: "a", value: 1 }).unwrap();
        registry.add_namespace(&Fixed { label: "a", value: 2 }).unwrap();

        assert_eq!(registry.len(), 1);
        let value = registry.lookup("a.value").unwrap().into_component().unwrap();
        assert_eq!(*value.downcast_ref::<u32>().unwrap(), 2);
    }

    #[test]
    fn build_errors_propagate() {
        let registry = Registry::new();
        let namespaces: Vec<Box<dyn Namespace>> = vec![Box::new(Failing)];
        let err = registry.add_namespace(namespaces[0].as_ref()).unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn bad_label_is_rejected_before_build() {
        let registry = Registry::new();
        let err = registry
            .add_namespace(&Fixed { label: "a.b", value: 0 })
            .unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
        assert!(registry.is_empty());
    }
}
