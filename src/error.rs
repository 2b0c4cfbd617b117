//! Error types for the query cache
//!
//! Only `Execution` and `KeyDerivation` ever reach a caller of the cached
//! executor. Store failures are reported through `tracing` and swallowed.

use thiserror::Error;

/// Main error type for cached query execution
#[derive(Error, Debug)]
pub enum QueryCacheError {
    /// The cache store failed to answer a read
    #[error("Cache read error for key {key}: {reason}")]
    CacheRead { key: String, reason: String },

    /// The cache store failed to persist a fresh result
    #[error("Cache write error for key {key}: {reason}")]
    CacheWrite { key: String, reason: String },

    /// The underlying execution engine failed
    #[error("Execution error: {0}")]
    Execution(String),

    /// The query description cannot be canonicalized into a stable key
    #[error("Key derivation error for model {model}: {reason}")]
    KeyDerivation { model: String, reason: String },

    /// A model was registered twice
    #[error("Model already registered: {0}")]
    ModelAlreadyRegistered(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl QueryCacheError {
    /// Shorthand for a store read failure
    pub fn cache_read(key: impl Into<String>, reason: impl ToString) -> Self {
        QueryCacheError::CacheRead {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a store write failure
    pub fn cache_write(key: impl Into<String>, reason: impl ToString) -> Self {
        QueryCacheError::CacheWrite {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that originate in the cache store
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            QueryCacheError::CacheRead { .. } | QueryCacheError::CacheWrite { .. }
        )
    }
}

/// Result type alias for query cache operations
pub type Result<T> = std::result::Result<T, QueryCacheError>;

impl From<String> for QueryCacheError {
    fn from(s: String) -> Self {
        QueryCacheError::Other(s)
    }
}

impl From<&str> for QueryCacheError {
    fn from(s: &str) -> Self {
        QueryCacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for QueryCacheError {
    fn from(e: serde_json::Error) -> Self {
        QueryCacheError::SerializationError(e.to_string())
    }
}
