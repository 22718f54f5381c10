//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or exceeds the maximum length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Strict lookup found no entry for the key
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Snapshot file exists but cannot be decoded
    #[error("Corrupt cache state in {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    /// Snapshot file could not be read or written
    #[error("Failed to persist cache to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be converted to or from the requested type
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::InvalidKey("key must not be empty".to_string());
        assert_eq!(err.to_string(), "Invalid key: key must not be empty");

        let err = CacheError::KeyNotFound("missing".to_string());
        assert_eq!(err.to_string(), "Key not found: missing");

        let err = CacheError::CorruptState {
            path: PathBuf::from("/tmp/run.cache"),
            reason: "bad header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt cache state in /tmp/run.cache: bad header"
        );
    }

    #[test]
    fn test_persistence_error_keeps_source() {
        use std::error::Error as _;

        let err = CacheError::Persistence {
            path: PathBuf::from("/nowhere/run.cache"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such dir"),
        };
        assert!(err.to_string().contains("/nowhere/run.cache"));
        assert!(err.source().is_some());
    }
}
