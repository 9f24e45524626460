//! Capability tags.
//!
//! A capability tag names the role a registered value plays ("is an app",
//! "is an event"). The tag plus a label addresses one registry slot, so two
//! unrelated values may share a label as long as their tags differ.
//!
//! Tags are marker types wrapped in a [`TagId`], following the same pattern
//! as other type-keyed identifiers in the workspace.
//!
//! ```
//! use plexus_registry::tag::{Apps, Tag, TagId};
//!
//! pub struct Validators;
//! impl Tag for Validators {}
//!
//! assert_ne!(TagId::of::<Apps>(), TagId::of::<Validators>());
//! assert_eq!(TagId::of::<Validators>().short_name(), "Validators");
//! ```

use core::any::TypeId;
use core::fmt;

/// Identifier for a capability tag, derived from a marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId {
    type_id: TypeId,
    type_name: &'static str,
}

impl TagId {
    /// Creates a `TagId` for the given tag marker type.
    #[must_use]
    pub fn of<T: Tag>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the full type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without its module path.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Marker trait for capability tag types.
///
/// The trait carries no methods. Any `'static` type can be a tag once it
/// opts in.
pub trait Tag: 'static {}

/// The default tag: ordinary components and branches.
///
/// [`Registry::contains`](crate::Registry::contains) and
/// [`Registry::branch`](crate::Registry::branch) operate on this tag.
pub struct Apps;
impl Tag for Apps {}

/// Event descriptors stored by an event manager.
pub struct Events;
impl Tag for Events {}
