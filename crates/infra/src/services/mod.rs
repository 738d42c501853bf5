//! Ledger services: the operations exposed to callers.
//!
//! Every balance-changing operation follows the same shape: take the
//! appropriate lock, re-read current state, apply the pure domain rule, then
//! commit one [`UnitOfWork`](crate::store::UnitOfWork).

pub mod accounts;
pub mod batch;
pub mod error;
pub mod interest;
pub mod rates;
pub mod settlement;
pub mod transfers;

use std::sync::Arc;
use std::time::Duration;

use bankcore_core::{AccountId, Clock};
use bankcore_ledger::{
    Account, MAX_NUMBER_ATTEMPTS, generate_unique, transaction_number_candidate,
};

use crate::kv::KeyValueStore;
use crate::lock::{DEFAULT_LEASE_TTL, DistributedLock};
use crate::store::{LedgerStore, StoreError};

pub use accounts::{AccountDetails, AccountService, OpenAccount};
pub use batch::{AccrualBatchReport, DailyAccrualBatch};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use interest::{AccrualResult, InterestAccrualService};
pub use rates::{ComposedRate, RateService};
pub use settlement::{SettlementResult, SettlementService};
pub use transfers::{TransferLockStrategy, TransferReceipt, TransferService};

pub const DEFAULT_ACCRUAL_PAGE_SIZE: usize = 100;

/// Shared handles every service needs.
#[derive(Clone)]
pub struct LedgerContext {
    pub store: Arc<dyn LedgerStore>,
    pub lock: DistributedLock,
    pub clock: Arc<dyn Clock>,
}

impl LedgerContext {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        lock_store: Arc<dyn KeyValueStore>,
        lease_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            lock: DistributedLock::new(lock_store, lease_ttl),
            clock,
        }
    }

    pub(crate) fn load_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.store
            .find_account(id)?
            .ok_or_else(|| LedgerError::not_found(format!("account {id} not found")))
    }

    /// `count` transaction numbers, unique in the store and among themselves.
    pub(crate) fn transaction_numbers(&self, count: usize) -> LedgerResult<Vec<String>> {
        let now = self.clock.now();
        let offset = self.clock.offset();
        let mut rng = rand::thread_rng();
        let mut numbers: Vec<String> = Vec::with_capacity(count);
        for _ in 0..count {
            let next = generate_unique(
                || transaction_number_candidate(&mut rng, now, offset),
                |candidate: &str| -> Result<bool, StoreError> {
                    if numbers.iter().any(|n| n == candidate) {
                        return Ok(true);
                    }
                    self.store.transaction_number_exists(candidate)
                },
                MAX_NUMBER_ATTEMPTS,
            )?
            .ok_or_else(|| LedgerError::Exhausted("transaction number".to_string()))?;
            numbers.push(next);
        }
        Ok(numbers)
    }
}

/// Tunables for [`LedgerServices::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub lease_ttl: Duration,
    pub transfer_strategy: TransferLockStrategy,
    pub accrual_page_size: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            lease_ttl: DEFAULT_LEASE_TTL,
            transfer_strategy: TransferLockStrategy::Distributed,
            accrual_page_size: DEFAULT_ACCRUAL_PAGE_SIZE,
        }
    }
}

/// All ledger services wired against one store, lock store and clock.
#[derive(Clone)]
pub struct LedgerServices {
    pub accounts: AccountService,
    pub transfers: TransferService,
    pub interest: InterestAccrualService,
    pub settlement: SettlementService,
    pub rates: RateService,
    pub batch: DailyAccrualBatch,
    clock: Arc<dyn Clock>,
}

impl LedgerServices {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        lock_store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        options: ServiceOptions,
    ) -> Self {
        let ctx = LedgerContext::new(store, lock_store, options.lease_ttl, clock.clone());
        let interest = InterestAccrualService::new(ctx.clone());
        let settlement = SettlementService::new(ctx.clone(), interest.clone());
        Self {
            accounts: AccountService::new(ctx.clone(), settlement.clone()),
            transfers: TransferService::new(ctx.clone(), options.transfer_strategy),
            batch: DailyAccrualBatch::new(ctx.clone(), interest.clone(), options.accrual_page_size),
            rates: RateService::new(ctx),
            interest,
            settlement,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
