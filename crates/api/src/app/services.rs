//! Runtime wiring: which stores back the ledger services.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use bankcore_core::{Clock, SystemClock};
use bankcore_infra::config::BankCoreConfig;
use bankcore_infra::idempotency::IdempotencyStore;
use bankcore_infra::kv::{InMemoryKeyValueStore, KeyValueStore};
use bankcore_infra::services::{LedgerResult, LedgerServices};
use bankcore_infra::store::{InMemoryLedgerStore, LedgerStore};

#[cfg(feature = "redis")]
use bankcore_infra::kv::RedisKeyValueStore;

/// Everything the HTTP handlers and the scheduler share.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: LedgerServices,
    pub idempotency: IdempotencyStore,
}

impl AppServices {
    pub fn new(ledger: LedgerServices, idempotency: IdempotencyStore) -> Self {
        Self {
            ledger,
            idempotency,
        }
    }

    /// Today's business date in the bank's timezone.
    pub fn today(&self) -> NaiveDate {
        self.ledger.clock().today()
    }
}

/// Build services for the running process from configuration.
pub fn build_services(config: &BankCoreConfig) -> anyhow::Result<AppServices> {
    let clock: Arc<dyn Clock> =
        Arc::new(SystemClock::with_offset_hours(config.timezone_offset_hours));
    let kv = key_value_store(config)?;
    Ok(wire(config, kv, clock)?)
}

/// Wire services over the given key-value store and clock, seeding the product
/// catalogue from `config`.
pub fn wire(
    config: &BankCoreConfig,
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
) -> LedgerResult<AppServices> {
    let store: Arc<dyn LedgerStore> =
        Arc::new(InMemoryLedgerStore::with_row_lock_timeout(config.row_lock_timeout));
    let ledger = LedgerServices::new(store, kv.clone(), clock, config.service_options());

    for product in &config.products {
        ledger.rates.register_product(product.clone())?;
    }
    info!(
        products = config.products.len(),
        transfer_strategy = %config.transfer_strategy,
        "ledger services ready"
    );

    Ok(AppServices::new(
        ledger,
        IdempotencyStore::new(kv, config.idempotency_ttl),
    ))
}

fn key_value_store(config: &BankCoreConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            let store = RedisKeyValueStore::new(&config.redis_url)?;
            info!("using redis for locks and idempotency");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "redis"))]
        tracing::warn!("USE_PERSISTENT_STORES is set but the redis feature is disabled; using in-memory stores");
    }
    Ok(Arc::new(InMemoryKeyValueStore::new()))
}
