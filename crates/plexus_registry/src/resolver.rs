//! Lazy resolution of deferred references.
//!
//! The [`Resolver`] turns a [`DeferredRef`] into a real value by importing the
//! path's top-level module through a [`Locator`] and walking the remaining
//! segments as attributes. When an attribute is missing, the walk tries to
//! import the submodule of that name before giving up, so `"pkg.sub.value"`
//! works whether or not `pkg.sub` has been imported yet.
//!
//! Walks that cross a [`Attr::Namespace`] continue as registry lookups under
//! the [`Apps`](crate::tag::Apps) tag.
//!
//! Only imports are cached. Attribute reads happen on every resolution, so a
//! value replaced or removed in a module or namespace is seen by the next
//! slot that defers to it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use plexus_registry::{DeferredRef, Resolver};
//! use plexus_registry::locator::ModuleTable;
//!
//! let resolver = Resolver::new(Arc::new(ModuleTable::with_builtins()));
//! let sqrt = resolver
//!     .resolve(&DeferredRef::path("math.sqrt"))
//!     .unwrap()
//!     .into_component()
//!     .unwrap();
//! assert_eq!(sqrt.downcast_ref::<fn(f64) -> f64>().unwrap()(4.0), 2.0);
//! ```

use core::fmt;
use std::sync::Arc;

use plexus_memo::Memoizer;

use crate::component::Component;
use crate::entry::{DeferredRef, Resolved};
use crate::error::{RegistryError, ResolveError};
use crate::locator::{Attr, Locator, Module};
use crate::tag::{Apps, TagId};

/// Number of imported modules remembered by default.
pub const DEFAULT_RESOLVE_CACHE_SIZE: usize = 128;

/// Resolves deferred references through a [`Locator`].
///
/// Imported modules are kept in a bounded LRU cache keyed by dotted module
/// name. Two registry slots that defer to the same path receive the identical
/// object as long as the attribute they read has not been replaced.
pub struct Resolver {
    locator: Arc<dyn Locator>,
    imports: Option<Memoizer<String, Arc<Module>>>,
}

impl Resolver {
    /// Creates a resolver with the default cache size.
    #[must_use]
    pub fn new(locator: Arc<dyn Locator>) -> Self {
        Self::with_cache_size(locator, DEFAULT_RESOLVE_CACHE_SIZE)
    }

    /// Creates a resolver remembering at most `cache_size` imported modules.
    ///
    /// A size of zero disables the cache.
    #[must_use]
    pub fn with_cache_size(locator: Arc<dyn Locator>, cache_size: usize) -> Self {
        Self {
            locator,
            imports: Memoizer::new(cache_size).ok(),
        }
    }

    /// Returns the locator used for imports.
    #[must_use]
    pub fn locator(&self) -> &Arc<dyn Locator> {
        &self.locator
    }

    /// Resolves a deferred reference.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] if the path is malformed, a module cannot be
    /// imported, an attribute is missing, or an include does not point at a
    /// namespace. Failures are not retried.
    pub fn resolve(&self, deferred: &DeferredRef) -> Result<Resolved, ResolveError> {
        match deferred {
            DeferredRef::Path(path) => self.resolve_path(path),
            DeferredRef::Include { module, attr } => {
                self.resolve_include(module, attr).map(Resolved::Branch)
            }
        }
    }

    /// Resolves a dotted path to a value or registry.
    ///
    /// A path that ends on a module resolves to a component wrapping that
    /// [`Module`](crate::locator::Module).
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_path(&self, path: &str) -> Result<Resolved, ResolveError> {
        let attr = self.walk(path)?;
        Ok(match attr {
            Attr::Value(component) => Resolved::Component(component),
            Attr::Module(module) => Resolved::Component(Component::from_arc(module)),
            Attr::Namespace(registry) => Resolved::Branch(registry),
        })
    }

    /// Imports `module` and reads the registry exposed under `attr`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotANamespace`] if the attribute holds anything
    /// but a registry, or any import/walk failure.
    pub fn resolve_include(
        &self,
        module: &str,
        attr: &str,
    ) -> Result<crate::registry::Registry, ResolveError> {
        let imported = match self.walk(module)? {
            Attr::Module(imported) => imported,
            Attr::Value(_) | Attr::Namespace(_) => {
                return Err(ResolveError::NotANamespace {
                    module: module.to_string(),
                    attr: attr.to_string(),
                });
            }
        };

        match imported.attr(attr) {
            Some(Attr::Namespace(registry)) => Ok(registry),
            Some(Attr::Value(_) | Attr::Module(_)) => Err(ResolveError::NotANamespace {
                module: module.to_string(),
                attr: attr.to_string(),
            }),
            None => Err(ResolveError::MissingAttribute {
                path: module.to_string(),
                attr: attr.to_string(),
            }),
        }
    }

    fn import(&self, module: &str) -> Result<Arc<Module>, ResolveError> {
        match &self.imports {
            Some(cache) => {
                cache.try_get_or_insert_with(module.to_string(), || self.locator.import(module))
            }
            None => self.locator.import(module),
        }
    }

    fn walk(&self, path: &str) -> Result<Attr, ResolveError> {
        let segments: Vec<&str> = path.split('.').collect();
        if path.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(ResolveError::InvalidPath(path.to_string()));
        }

        let (top, rest) = segments
            .split_first()
            .ok_or_else(|| ResolveError::InvalidPath(path.to_string()))?;
        let mut current = Attr::Module(self.import(top)?);
        let mut walked = (*top).to_string();

        for segment in rest {
            current = match current {
                Attr::Module(module) => match module.attr(segment) {
                    Some(attr) => attr,
                    None => {
                        let submodule = format!("{walked}.{segment}");
                        match self.import(&submodule) {
                            Ok(imported) => Attr::Module(imported),
                            Err(ResolveError::ModuleNotFound(_)) => {
                                return Err(ResolveError::MissingAttribute {
                                    path: walked,
                                    attr: (*segment).to_string(),
                                });
                            }
                            Err(other) => return Err(other),
                        }
                    }
                },
                Attr::Namespace(registry) => match registry.get_by_id(TagId::of::<Apps>(), segment) {
                    Ok(Resolved::Component(component)) => Attr::Value(component),
                    Ok(Resolved::Branch(branch)) => Attr::Namespace(branch),
                    Err(RegistryError::Resolve(err)) => return Err(err),
                    Err(_) => {
                        return Err(ResolveError::MissingAttribute {
                            path: walked,
                            attr: (*segment).to_string(),
                        });
                    }
                },
                Attr::Value(_) => {
                    return Err(ResolveError::MissingAttribute {
                        path: walked,
                        attr: (*segment).to_string(),
                    });
                }
            };
            walked.push('.');
            walked.push_str(segment);
        }

        tracing::trace!(path, "resolved import path");
        Ok(current)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("imports", &self.imports)
            .finish_non_exhaustive()
    }
}
