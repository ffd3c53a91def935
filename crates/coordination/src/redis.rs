//! Redis-backed coordination store.
//!
//! Locks use `SET key token NX PX ttl`; release is a compare-and-delete
//! Lua script so only the current owner can remove the key. Cached
//! documents are JSON strings with a `PX` expiry.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::error::CoordinationError;
use crate::store::{DocumentCache, LockStore, LockToken};

const RELEASE_LOCK: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis lock store and document cache sharing one multiplexed
/// connection.
#[derive(Clone)]
pub struct RedisCoordination {
    conn: MultiplexedConnection,
}

impl RedisCoordination {
    /// Connects to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self, CoordinationError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    /// Wraps an existing connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl LockStore for RedisCoordination {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, CoordinationError> {
        let token = LockToken::new();
        let granted: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut self.conn.clone())
            .await?;

        Ok(granted.map(|_| token))
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<bool, CoordinationError> {
        let deleted: i64 = redis::Script::new(RELEASE_LOCK)
            .key(key)
            .arg(token.as_str())
            .invoke_async(&mut self.conn.clone())
            .await?;

        Ok(deleted == 1)
    }
}

#[async_trait]
impl DocumentCache for RedisCoordination {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CoordinationError> {
        let raw: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?;

        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CoordinationError> {
        let raw = serde_json::to_string(&value)?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(raw)
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoordinationError> {
        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(())
    }
}
