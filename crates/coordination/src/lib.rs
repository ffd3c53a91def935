//! Distributed coordination store wrapper.
//!
//! Two responsibilities share one backing key-value store:
//! - mutual-exclusion locks: create-if-absent with TTL, released only by
//!   the holder that owns the returned token
//! - a short-lived cache of assembled order documents, used purely as a
//!   read optimization (never the system of record)
//!
//! The in-memory backend serves tests and single-node runs; the Redis
//! backend serves multi-instance deployments.

mod error;
mod memory;
mod redis;
mod store;

pub use error::CoordinationError;
pub use memory::InMemoryCoordination;
pub use self::redis::RedisCoordination;
pub use store::{DocumentCache, LockStore, LockToken};
