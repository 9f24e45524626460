//! Bounded memoization for Plexus (Layer 0).
//!
//! `plexus_memo` provides a least-recently-used cache and a function wrapper
//! built on it. Registry call sites use it to avoid re-walking module and
//! branch chains on hot lookup paths, but nothing here is registry-specific.
//!
//! - [`Memoizer`] - Thread-safe LRU cache with hit/miss accounting
//! - [`Memoized`] - A function paired with its own [`Memoizer`]
//! - [`CallKey`] - Cache key made of positional arguments and sorted keyword items
//!
//! # Example
//!
//! ```
//! use plexus_memo::{CallKey, memoize};
//!
//! let area = memoize(2, |key: &CallKey<(u32, u32), u32>| {
//!     let (w, h) = key.args;
//!     w * h * key.kwarg("scale").copied().unwrap_or(1)
//! })
//! .unwrap();
//!
//! assert_eq!(area.call(CallKey::new((2, 3))), 6);
//! assert_eq!(area.call(CallKey::new((2, 3)).with_kwarg("scale", 10)), 60);
//! assert_eq!(area.stats().misses, 2);
//! ```

mod cache;
mod error;
mod key;
mod memoized;

pub use cache::{MemoStats, Memoizer};
pub use error::MemoError;
pub use key::CallKey;
pub use memoized::{Memoized, memoize};
