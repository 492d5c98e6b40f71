//! Error types for the memory cache
//!
//! Store operations never fail hard; these variants describe why a write was
//! rejected or why a cache could not be constructed.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the memory cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key was empty
    #[error("Key must not be empty")]
    EmptyKey,

    /// Record is flagged as not storable in memory
    #[error("Record for key '{0}' is not allowed in memory")]
    StorageNotAllowed(String),

    /// Record alone is larger than the whole cache
    #[error("Record of {size} bytes exceeds memory capacity of {capacity} bytes")]
    CapacityExceeded { size: u64, capacity: u64 },

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No tokio runtime to host the sweep timer and async operations
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the memory cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_names_both_sizes() {
        let err = CacheError::CapacityExceeded {
            size: 2048,
            capacity: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Record of 2048 bytes exceeds memory capacity of 1024 bytes"
        );
    }

    #[test]
    fn test_storage_not_allowed_message() {
        let err = CacheError::StorageNotAllowed("avatar".to_string());
        assert!(err.to_string().contains("avatar"));
    }
}
