//! Error types for store operations.
//!
//! Only `delete` can fail. `set` never fails and `get` reports a miss as
//! `None`, so the taxonomy stays at a single kind.

use thiserror::Error;

/// Errors returned by [`TtlStore`](crate::storage::TtlStore) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key was not physically present when the write lock was taken
    #[error("key not found: {0}")]
    NotFound(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound("session:42".to_string());
        assert_eq!(err.to_string(), "key not found: session:42");
    }
}
