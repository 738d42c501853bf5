use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Key-value store operation error.
///
/// Callers never treat these as "absent": an unreachable store fails the
/// operation that needed it.
#[derive(Debug, Clone, Error)]
pub enum KvError {
    #[error("key-value store connection error: {0}")]
    Connection(String),

    #[error("key-value store command error: {0}")]
    Command(String),

    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal TTL-aware key-value contract.
///
/// ## Implementation Requirements
///
/// - `set_if_absent` must be atomic (exactly one concurrent caller wins)
/// - `compare_and_delete` must be atomic (no window between the read and the delete)
/// - expired keys behave exactly like absent keys
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key` only if no live value exists. Returns `true` when stored.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError>;

    /// Delete `key` only if its current value equals `expected`. Returns `true` when deleted.
    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, KvError>;

    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Unconditionally store `value` with a fresh TTL.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    fn delete(&self, key: &str) -> Result<(), KvError>;
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        (**self).set_if_absent(key, value, ttl)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        (**self).compare_and_delete(key, expected)
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        (**self).set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        (**self).delete(key)
    }
}
