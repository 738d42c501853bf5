use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::r#trait::{KeyValueStore, KvError};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Entries {
    /// Drop every expired entry once `interval` has passed since the last sweep.
    fn sweep_if_due(&mut self, now: Instant, interval: Duration) {
        if now.duration_since(self.last_sweep) < interval {
            return;
        }
        self.map.retain(|_, e| e.is_live(now));
        self.last_sweep = now;
    }
}

/// In-memory TTL key-value store.
///
/// Intended for tests/dev and single-instance deployments. Expired entries are
/// evicted when read, and writes sweep the whole map at most once per sweep
/// interval so keys that are never read again do not pile up.
#[derive(Debug)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<Entries>,
    sweep_interval: Duration,
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            sweep_interval,
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, Entries>, KvError> {
        self.entries
            .lock()
            .map_err(|_| KvError::Unavailable("lock poisoned".to_string()))
    }

    fn write(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        only_if_absent: bool,
    ) -> Result<bool, KvError> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        entries.sweep_if_due(now, self.sweep_interval);
        if only_if_absent && entries.map.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        self.write(key, value, ttl, true)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        match entries.map.get(key) {
            Some(e) if e.is_live(now) && e.value == expected => {
                entries.map.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        match entries.map.get(key) {
            Some(e) if e.is_live(now) => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.write(key, value, ttl, false).map(|_| ())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries()?.map.remove(key);
        Ok(())
    }
}
