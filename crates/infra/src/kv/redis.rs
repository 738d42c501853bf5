//! Redis-backed key-value store.
//!
//! - `set_if_absent` is `SET key value NX PX ttl`
//! - `compare_and_delete` runs a Lua script so the check and the delete are atomic

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use super::r#trait::{KeyValueStore, KvError};

const COMPARE_AND_DELETE: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

#[derive(Debug, Clone)]
pub struct RedisKeyValueStore {
    client: Arc<redis::Client>,
    compare_and_delete: Arc<redis::Script>,
}

impl RedisKeyValueStore {
    /// Create a store from a Redis URL (e.g. `redis://localhost:6379`).
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| KvError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            compare_and_delete: Arc::new(redis::Script::new(COMPARE_AND_DELETE)),
        })
    }

    fn connection(&self) -> Result<redis::Connection, KvError> {
        self.client
            .get_connection()
            .map_err(|e| KvError::Connection(e.to_string()))
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl KeyValueStore for RedisKeyValueStore {
    #[instrument(skip(self, value), err)]
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut conn = self.connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query(&mut conn)
            .map_err(|e| KvError::Command(format!("SET NX failed: {e}")))?;
        Ok(reply.is_some())
    }

    #[instrument(skip(self, expected), err)]
    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let mut conn = self.connection()?;
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke(&mut conn)
            .map_err(|e| KvError::Command(format!("compare-and-delete failed: {e}")))?;
        Ok(deleted > 0)
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.connection()?;
        redis::cmd("GET")
            .arg(key)
            .query(&mut conn)
            .map_err(|e| KvError::Command(format!("GET failed: {e}")))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.connection()?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query(&mut conn)
            .map_err(|e| KvError::Command(format!("SET failed: {e}")))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.connection()?;
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query(&mut conn)
            .map_err(|e| KvError::Command(format!("DEL failed: {e}")))?;
        Ok(())
    }
}
