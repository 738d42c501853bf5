//! Distributed lock service.
//!
//! A lock is a key `lock:{domain}:{key}` holding a random lease token, set with
//! set-if-absent and a short TTL. Acquisition never waits: a held lease fails
//! fast with [`LedgerError::Busy`] and the caller retries at a higher layer.
//! Release is compare-and-delete, so a holder whose lease already expired can
//! never delete a lease that now belongs to someone else.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::kv::{KeyValueStore, KvError};
use crate::services::error::LedgerError;

pub const LOCK_KEY_PREFIX: &str = "lock:";
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(5);

/// Lock domains used by the ledger services.
pub mod domains {
    pub const ACCOUNT: &str = "account";
    pub const INTEREST_ACCRUAL: &str = "interest-accrual";
    pub const INTEREST_SETTLEMENT: &str = "interest-settlement";
}

#[derive(Clone)]
pub struct DistributedLock {
    store: Arc<dyn KeyValueStore>,
    lease_ttl: Duration,
}

impl core::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("lease_ttl", &self.lease_ttl)
            .finish_non_exhaustive()
    }
}

impl DistributedLock {
    pub fn new(store: Arc<dyn KeyValueStore>, lease_ttl: Duration) -> Self {
        Self { store, lease_ttl }
    }

    pub fn lock_key(domain: &str, key: &str) -> String {
        format!("{LOCK_KEY_PREFIX}{domain}:{key}")
    }

    /// Run `action` while holding the lease for `domain`/`key`.
    ///
    /// Errors from `action` are returned after the release attempt. A release
    /// failure is attached to the action's error as a suppressed cause; if the
    /// action succeeded its result stands and the release failure is logged,
    /// leaving the lease to expire on its TTL.
    #[instrument(skip(self, action), fields(lock_key = %Self::lock_key(domain, key)))]
    pub fn execute_with_lock<T>(
        &self,
        domain: &str,
        key: &str,
        action: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let lock_key = Self::lock_key(domain, key);
        let token = Uuid::new_v4().to_string();

        if !self.store.set_if_absent(&lock_key, &token, self.lease_ttl)? {
            debug!("lease held by another caller");
            return Err(LedgerError::Busy(lock_key));
        }

        let outcome = action();
        let released = self.release(&lock_key, &token);

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(value), Err(release)) => {
                error!(error = %release, "lock release failed after a successful action");
                Ok(value)
            }
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(release)) => Err(primary.with_suppressed(release)),
        }
    }

    fn release(&self, lock_key: &str, token: &str) -> Result<(), KvError> {
        if !self.store.compare_and_delete(lock_key, token)? {
            // Lease expired (and possibly re-acquired by someone else) while the action ran.
            warn!(lock_key, "lease no longer owned at release time");
        }
        Ok(())
    }
}
