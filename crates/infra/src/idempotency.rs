//! Idempotency cache for mutating requests.
//!
//! The first request for a scoped key claims it with a `PROCESSING` marker.
//! A successful response body replaces the marker; a failed request clears it
//! so the client may retry. Everything expires after the configured TTL.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::kv::{KeyValueStore, KvError};

pub const IDEMPOTENCY_KEY_PREFIX: &str = "idempotency:";
pub const PROCESSING_MARKER: &str = "PROCESSING";
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// What the cache holds for a key that could not be claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResponse {
    /// The first request is still running.
    InProgress,
    /// The first request completed; replay this body verbatim.
    Completed(String),
    /// The key vanished between the claim attempt and the lookup.
    Absent,
}

#[derive(Clone)]
pub struct IdempotencyStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl core::fmt::Debug for IdempotencyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdempotencyStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl IdempotencyStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// `{METHOD}:{path}:{key}` so the same client key on different endpoints never collides.
    pub fn scoped_key(method: &str, path: &str, key: &str) -> String {
        format!("{method}:{path}:{key}")
    }

    fn storage_key(key: &str) -> String {
        format!("{IDEMPOTENCY_KEY_PREFIX}{key}")
    }

    /// Claim `key`. Returns `true` only for the first caller.
    #[instrument(skip(self), err)]
    pub fn try_acquire(&self, key: &str) -> Result<bool, KvError> {
        self.store
            .set_if_absent(&Self::storage_key(key), PROCESSING_MARKER, self.ttl)
    }

    pub fn get_response(&self, key: &str) -> Result<CachedResponse, KvError> {
        Ok(match self.store.get(&Self::storage_key(key))? {
            None => CachedResponse::Absent,
            Some(v) if v == PROCESSING_MARKER => CachedResponse::InProgress,
            Some(body) => CachedResponse::Completed(body),
        })
    }

    pub fn save_response(&self, key: &str, body: &str) -> Result<(), KvError> {
        self.store.set(&Self::storage_key(key), body, self.ttl)
    }

    pub fn clear(&self, key: &str) -> Result<(), KvError> {
        self.store.delete(&Self::storage_key(key))
    }
}
