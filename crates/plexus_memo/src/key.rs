//! Cache keys for memoized calls.

use std::collections::BTreeMap;

/// Cache key for a memoized call: the positional arguments plus the keyword
/// items in sorted order.
///
/// Keyword items live in a [`BTreeMap`], so two keys built with the same
/// keywords in a different order hash and compare equal.
///
/// # Example
///
/// ```
/// use plexus_memo::CallKey;
///
/// let a = CallKey::new(("sqrt", 4)).with_kwarg("x", 1).with_kwarg("y", 2);
/// let b = CallKey::new(("sqrt", 4)).with_kwarg("y", 2).with_kwarg("x", 1);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallKey<A, W = ()> {
    /// Positional arguments, usually a tuple.
    pub args: A,
    kwargs: BTreeMap<String, W>,
}

impl<A, W> CallKey<A, W> {
    /// Creates a key from positional arguments with no keyword items.
    #[must_use]
    pub fn new(args: A) -> Self {
        Self {
            args,
            kwargs: BTreeMap::new(),
        }
    }

    /// Adds a keyword item, replacing any previous value for `name`.
    #[must_use]
    pub fn with_kwarg(mut self, name: impl Into<String>, value: W) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }

    /// Adds every keyword item from `items`.
    #[must_use]
    pub fn with_kwargs<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (S, W)>,
        S: Into<String>,
    {
        self.kwargs
            .extend(items.into_iter().map(|(name, value)| (name.into(), value)));
        self
    }

    /// Returns the keyword value for `name`, if present.
    #[must_use]
    pub fn kwarg(&self, name: &str) -> Option<&W> {
        self.kwargs.get(name)
    }

    /// Iterates keyword items in sorted order.
    pub fn kwargs(&self) -> impl Iterator<Item = (&str, &W)> {
        self.kwargs.iter().map(|(name, value)| (name.as_str(), value))
    }
}
