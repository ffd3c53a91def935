//! In-memory coordination store for testing and single-node runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::CoordinationError;
use crate::store::{DocumentCache, LockStore, LockToken};

#[derive(Debug, Default)]
struct CoordinationState {
    locks: HashMap<String, (LockToken, Instant)>,
    cache: HashMap<String, (serde_json::Value, Instant)>,
}

/// In-memory lock store and document cache.
///
/// Expired entries are dropped lazily on access, which is how the Redis
/// backend behaves from a caller's point of view.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCoordination {
    state: Arc<RwLock<CoordinationState>>,
}

impl InMemoryCoordination {
    /// Creates an empty coordination store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a live (non-expired) lock exists for the key.
    pub fn is_locked(&self, key: &str) -> bool {
        let state = self.state.read().unwrap();
        state
            .locks
            .get(key)
            .is_some_and(|(_, deadline)| *deadline > Instant::now())
    }

    /// Returns the number of live cached documents.
    pub fn cached_count(&self) -> usize {
        let now = Instant::now();
        let state = self.state.read().unwrap();
        state
            .cache
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }
}

#[async_trait]
impl LockStore for InMemoryCoordination {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, CoordinationError> {
        let now = Instant::now();
        let mut state = self.state.write().unwrap();

        if let Some((_, deadline)) = state.locks.get(key) {
            if *deadline > now {
                return Ok(None);
            }
            state.locks.remove(key);
        }

        let token = LockToken::new();
        state.locks.insert(key.to_string(), (token.clone(), now + ttl));
        Ok(Some(token))
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<bool, CoordinationError> {
        let mut state = self.state.write().unwrap();
        match state.locks.get(key) {
            Some((owner, _)) if owner == token => {
                state.locks.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DocumentCache for InMemoryCoordination {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CoordinationError> {
        let now = Instant::now();
        let mut state = self.state.write().unwrap();
        match state.cache.get(key) {
            Some((value, deadline)) if *deadline > now => Ok(Some(value.clone())),
            Some(_) => {
                state.cache.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CoordinationError> {
        let mut state = self.state.write().unwrap();
        state
            .cache
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoordinationError> {
        let mut state = self.state.write().unwrap();
        state.cache.remove(key);
        Ok(())
    }
}
