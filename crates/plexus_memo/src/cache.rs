//! Thread-safe LRU cache.

use core::hash::Hash;
use core::num::NonZeroUsize;
use core::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::MemoError;

/// Hit and miss counters for a [`Memoizer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to compute a value.
    pub misses: u64,
}

/// A bounded least-recently-used cache.
///
/// A hit refreshes the entry's recency. A miss computes the value and, if the
/// cache is full, evicts the least recently used entry before inserting.
///
/// # Thread Safety
///
/// The cache sits behind a [`Mutex`] that is released while a missing value is
/// computed, so a compute closure may itself use the memoizer. Two threads
/// missing on the same key at once will both compute; the later insert wins.
pub struct Memoizer<K, V> {
    cache: Mutex<LruCache<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> Memoizer<K, V> {
    /// Creates a memoizer that holds at most `max_size` entries.
    ///
    /// # Errors
    ///
    /// Returns [`MemoError::ZeroCapacity`] if `max_size` is zero.
    pub fn new(max_size: usize) -> Result<Self, MemoError> {
        let capacity = NonZeroUsize::new(max_size).ok_or(MemoError::ZeroCapacity)?;
        Ok(Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Returns a cached value and marks it most recently used.
    ///
    /// Does not touch the hit/miss counters.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.cache.lock().get(key).cloned()
    }

    /// Returns the cached value for `key`, computing and caching it on a miss.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.hit(&key) {
            return value;
        }
        let value = compute();
        self.cache.lock().put(key, value.clone());
        value
    }

    /// Fallible variant of [`get_or_insert_with`](Self::get_or_insert_with).
    ///
    /// Errors are returned to the caller and never cached.
    ///
    /// # Errors
    ///
    /// Returns whatever `compute` returns on failure.
    pub fn try_get_or_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.hit(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.cache.lock().put(key, value.clone());
        Ok(value)
    }

    /// Inserts a value directly, returning the entry it displaced, if any.
    ///
    /// The displaced entry is either the previous value for `key` or the
    /// least recently used entry evicted to make room.
    pub fn insert(&self, key: K, value: V) -> Option<(K, V)> {
        self.cache.lock().push(key, value)
    }

    /// Returns `true` if `key` is cached, without refreshing its recency.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.cache.lock().contains(key)
    }

    /// Removes `key` from the cache.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.cache.lock().pop(key)
    }

    /// Removes every entry. Counters are left untouched.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    /// Returns the hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn hit(&self, key: &K) -> Option<V> {
        let cached = self.cache.lock().get(key).cloned();
        let counter = if cached.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        cached
    }
}

impl<K: Hash + Eq, V> core::fmt::Debug for Memoizer<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("Memoizer")
            .field("len", &cache.len())
            .field("capacity", &cache.cap())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
