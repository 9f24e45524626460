//! Registry entries and deferred references.

use core::fmt;

use crate::component::Component;
use crate::registry::Registry;

/// Attribute read off an included module when no other label is given.
pub const DEFAULT_INCLUDE_ATTR: &str = "apps";

/// An unresolved pointer to a component.
///
/// Stored in place of the real value until the first lookup, which resolves
/// it through the registry's [`Resolver`](crate::Resolver) and replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeferredRef {
    /// A dotted import path such as `"math.sqrt"`.
    Path(String),
    /// Another namespace's component set: the registry found at attribute
    /// `attr` of the module at `module`.
    Include {
        /// Dotted path of the module to import.
        module: String,
        /// Attribute on that module holding a registry.
        attr: String,
    },
}

impl DeferredRef {
    /// Creates a reference to a dotted import path.
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Creates an include reference reading the default `apps` attribute.
    #[must_use]
    pub fn include(module: impl Into<String>) -> Self {
        Self::include_attr(module, DEFAULT_INCLUDE_ATTR)
    }

    /// Creates an include reference reading a specific attribute.
    #[must_use]
    pub fn include_attr(module: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::Include {
            module: module.into(),
            attr: attr.into(),
        }
    }
}

impl fmt::Display for DeferredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredRef::Path(path) => f.write_str(path),
            DeferredRef::Include { module, attr } => write!(f, "include({module}, {attr})"),
        }
    }
}

/// The value held by a registry slot.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A concrete value.
    Component(Component),
    /// A nested registry owned by this slot.
    Branch(Registry),
    /// A placeholder resolved on first lookup.
    Deferred(DeferredRef),
}

impl Entry {
    /// Returns `true` if this entry has not been resolved yet.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Entry::Deferred(_))
    }

    /// Returns a short name for the entry's variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Component(_) => "component",
            Entry::Branch(_) => "branch",
            Entry::Deferred(_) => "deferred reference",
        }
    }
}

/// A looked-up value. Lookups never hand out a [`DeferredRef`].
#[derive(Debug, Clone)]
pub enum Resolved {
    /// A concrete value.
    Component(Component),
    /// A nested registry.
    Branch(Registry),
}

impl Resolved {
    /// Returns the component, if this is one.
    #[must_use]
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Resolved::Component(component) => Some(component),
            Resolved::Branch(_) => None,
        }
    }

    /// Converts into the component, if this is one.
    #[must_use]
    pub fn into_component(self) -> Option<Component> {
        match self {
            Resolved::Component(component) => Some(component),
            Resolved::Branch(_) => None,
        }
    }

    /// Returns the branch, if this is one.
    #[must_use]
    pub fn as_branch(&self) -> Option<&Registry> {
        match self {
            Resolved::Branch(branch) => Some(branch),
            Resolved::Component(_) => None,
        }
    }

    /// Converts into the branch, if this is one.
    #[must_use]
    pub fn into_branch(self) -> Option<Registry> {
        match self {
            Resolved::Branch(branch) => Some(branch),
            Resolved::Component(_) => None,
        }
    }

    /// Returns a short name for the variant, or the component's type name.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Resolved::Component(component) => component.type_name(),
            Resolved::Branch(_) => "branch",
        }
    }
}

impl From<Resolved> for Entry {
    fn from(resolved: Resolved) -> Self {
        match resolved {
            Resolved::Component(component) => Entry::Component(component),
            Resolved::Branch(branch) => Entry::Branch(branch),
        }
    }
}

impl From<Component> for Entry {
    fn from(component: Component) -> Self {
        Entry::Component(component)
    }
}

impl From<Registry> for Entry {
    fn from(branch: Registry) -> Self {
        Entry::Branch(branch)
    }
}

impl From<DeferredRef> for Entry {
    fn from(deferred: DeferredRef) -> Self {
        Entry::Deferred(deferred)
    }
}

/// Strings are import paths.
impl From<&str> for Entry {
    fn from(path: &str) -> Self {
        Entry::Deferred(DeferredRef::path(path))
    }
}

impl From<String> for Entry {
    fn from(path: String) -> Self {
        Entry::Deferred(DeferredRef::Path(path))
    }
}

/// `(module, attr)` pairs are includes.
impl From<(&str, &str)> for Entry {
    fn from((module, attr): (&str, &str)) -> Self {
        Entry::Deferred(DeferredRef::include_attr(module, attr))
    }
}
