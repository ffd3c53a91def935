//! Lock and cache traits over the coordination store.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoordinationError;

/// Ownership token returned by a successful lock acquisition.
///
/// Release is conditional on the token matching, so a holder whose lock
/// already expired cannot release a lock re-acquired by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    /// Creates a fresh random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutual-exclusion locks with TTL-bounded ownership.
///
/// At most one holder per key at any instant; expiry guarantees eventual
/// release even when the holder crashes.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create-if-absent acquisition with TTL.
    ///
    /// Returns `Some(token)` on success and `None` when the lock is held
    /// by someone else. Never blocks or queues; callers retry with
    /// backoff.
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, CoordinationError>;

    /// Conditional delete: releases the lock only if `token` still owns
    /// it. Returns true when this call performed the release.
    async fn release(&self, key: &str, token: &LockToken) -> Result<bool, CoordinationError>;
}

/// Short-lived cache of JSON documents.
///
/// Purely a read optimization: callers must stay correct if the cache is
/// unavailable or evicts early.
#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// Looks up a document, honoring expiry.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CoordinationError>;

    /// Stores a document with a TTL, replacing any previous value.
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CoordinationError>;

    /// Removes a document if present.
    async fn delete(&self, key: &str) -> Result<(), CoordinationError>;
}
