//! Key-value store boundary used for lock leases and the idempotency cache.
//!
//! Kept independent of the ledger store: lock and idempotency state lives in a
//! shared cache (Redis in production) so that every API instance sees it.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod r#trait;

pub use in_memory::InMemoryKeyValueStore;
#[cfg(feature = "redis")]
pub use redis::RedisKeyValueStore;
pub use r#trait::{KeyValueStore, KvError};
