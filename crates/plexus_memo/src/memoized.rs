//! Function memoization.

use core::hash::Hash;

use crate::cache::{MemoStats, Memoizer};
use crate::error::MemoError;

/// A function wrapped with its own bounded [`Memoizer`].
///
/// Created with [`memoize`]. The wrapped function should be pure: the cache
/// assumes equal keys always produce equal results.
pub struct Memoized<K, V, F> {
    function: F,
    cache: Memoizer<K, V>,
}

impl<K, V, F> Memoized<K, V, F>
where
    K: Hash + Eq + Clone,
    V: Clone,
    F: Fn(&K) -> V,
{
    /// Calls the function, answering from the cache when possible.
    pub fn call(&self, key: K) -> V {
        let compute_key = key.clone();
        self.cache
            .get_or_insert_with(key, || (self.function)(&compute_key))
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &Memoizer<K, V> {
        &self.cache
    }

    /// Returns the cache's hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> MemoStats {
        self.cache.stats()
    }
}

impl<K: Hash + Eq, V, F> core::fmt::Debug for Memoized<K, V, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Memoized")
            .field("function", &core::any::type_name::<F>())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Wraps `function` in an LRU cache holding at most `max_size` results.
///
/// # Errors
///
/// Returns [`MemoError::ZeroCapacity`] if `max_size` is zero.
///
/// # Example
///
/// ```
/// use plexus_memo::memoize;
///
/// let square = memoize(16, |n: &u64| n * n).unwrap();
/// assert_eq!(square.call(12), 144);
/// assert_eq!(square.call(12), 144);
/// assert_eq!(square.stats().hits, 1);
/// ```
pub fn memoize<K, V, F>(max_size: usize, function: F) -> Result<Memoized<K, V, F>, MemoError>
where
    K: Hash + Eq + Clone,
    V: Clone,
    F: Fn(&K) -> V,
{
    Ok(Memoized {
        function,
        cache: Memoizer::new(max_size)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CallKey;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lru_eviction_keeps_recently_used_key() {
        let calls = AtomicUsize::new(0);
        let upper = memoize(2, |key: &CallKey<&str>| {
            calls.fetch_add(1, Ordering::SeqCst);
            key.args.to_uppercase()
        })
        .unwrap();

        upper.call(CallKey::new("a"));
        upper.call(CallKey::new("b"));
        upper.call(CallKey::new("c"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // "a" was evicted by "c", so this recomputes and evicts "b"
        upper.call(CallKey::new("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        // "c" and "a" are cached, "b" is gone
        upper.call(CallKey::new("c"));
        upper.call(CallKey::new("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        upper.call(CallKey::new("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn keyword_items_are_part_of_the_key() {
        let scaled = memoize(8, |key: &CallKey<i64, i64>| {
            key.args * key.kwarg("factor").copied().unwrap_or(1)
        })
        .unwrap();

        assert_eq!(scaled.call(CallKey::new(3)), 3);
        assert_eq!(scaled.call(CallKey::new(3).with_kwarg("factor", 4)), 12);
        assert_eq!(scaled.stats().misses, 2);
        assert_eq!(scaled.stats().hits, 0);
    }

    #[test]
    fn debug_shows_the_cache() {
        let double = memoize(2, |n: &u32| n * 2).unwrap();
        double.call(4);

        let rendered = format!("{double:?}");
        assert!(rendered.starts_with("Memoized { function: "));
        assert!(rendered.contains("cache: Memoizer { len: 1, capacity: 2, hits: 0, misses: 1 }"));
    }

    #[test]
    fn memoize_rejects_zero_size() {
        let result = memoize(0, |n: &u8| *n);
        assert!(matches!(result, Err(MemoError::ZeroCapacity)));
    }
}
