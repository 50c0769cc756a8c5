//! Error types for cache operations
//!
//! Every error is `Clone` so that a single failed fetch can be handed to all
//! callers that joined it.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Shared, clonable error produced by a data source
pub type SharedSourceError = Arc<dyn StdError + Send + Sync + 'static>;

/// Main error type for cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The producer behind a key failed and no stale entry could stand in
    #[error("Producer for '{key}' failed: {source}")]
    Producer {
        key: String,
        #[source]
        source: SharedSourceError,
    },

    /// The fetch behind a key panicked before completing
    #[error("Producer for '{key}' panicked")]
    ProducerPanicked { key: String },

    /// A key was read back as a different type than it was written with
    #[error("Cached value for '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A kind name that is not part of the configuration table
    #[error("Unknown cache kind: {0}")]
    UnknownKind(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wrap a producer failure for `key`
    pub fn producer(key: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        CacheError::Producer {
            key: key.into(),
            source: Arc::from(source.into()),
        }
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
