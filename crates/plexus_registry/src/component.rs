//! Type-erased component values.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

/// A registered value: any `Send + Sync + 'static` type behind a shared
/// pointer.
///
/// Cloning a `Component` clones the pointer, never the value, so every holder
/// observes the same object. Use [`ptr_eq`](Self::ptr_eq) to compare identity.
///
/// # Example
///
/// ```
/// use plexus_registry::Component;
///
/// let sqrt = Component::new(f64::sqrt as fn(f64) -> f64);
/// let f = sqrt.downcast_ref::<fn(f64) -> f64>().unwrap();
/// assert_eq!(f(9.0), 3.0);
///
/// let same = sqrt.clone();
/// assert!(sqrt.ptr_eq(&same));
/// ```
#[derive(Clone)]
pub struct Component {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Component {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without reallocating it.
    #[must_use]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the concrete type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the wrapped value is a `T`.
    #[must_use]
    pub fn is<T: Send + Sync + 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns a shared pointer to the wrapped value as a `T`.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Returns `true` if both components point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Component) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.type_name).finish()
    }
}
