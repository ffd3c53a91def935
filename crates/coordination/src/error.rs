//! Coordination store error types.

use thiserror::Error;

/// Errors that can occur against the coordination store.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Error from the Redis backend.
    #[error("coordination store error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A cached document failed to serialize or deserialize.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
