//! Error types for memoization.

/// Errors that can occur when constructing a memoizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoError {
    /// A memoizer cannot hold zero entries.
    #[error("memoizer capacity must be at least 1")]
    ZeroCapacity,
}
