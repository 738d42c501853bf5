//! Configuration loading and representation.
//!
//! Everything comes from environment variables with working defaults, so a
//! bare `cargo run` starts an in-memory instance.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;

use bankcore_ledger::Product;
use bankcore_observability::LogFormat;

use crate::idempotency::DEFAULT_IDEMPOTENCY_TTL;
use crate::lock::DEFAULT_LEASE_TTL;
use crate::services::{DEFAULT_ACCRUAL_PAGE_SIZE, ServiceOptions, TransferLockStrategy};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankCoreConfig {
    pub bind_addr: SocketAddr,
    pub transfer_strategy: TransferLockStrategy,
    pub lock_ttl: Duration,
    pub row_lock_timeout: Duration,
    pub idempotency_ttl: Duration,
    /// Bank-local offset east of UTC, in hours.
    pub timezone_offset_hours: i32,
    pub accrual_page_size: usize,
    /// Local time of day the daily accrual runs.
    pub accrual_time: NaiveTime,
    /// Run the accrual batch once for today and exit instead of serving.
    pub accrual_run_once: bool,
    pub log_format: LogFormat,
    pub use_persistent_stores: bool,
    pub redis_url: String,
    pub products: Vec<Product>,
}

impl Default for BankCoreConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            transfer_strategy: TransferLockStrategy::Distributed,
            lock_ttl: DEFAULT_LEASE_TTL,
            row_lock_timeout: Duration::from_secs(3),
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL,
            timezone_offset_hours: 9,
            accrual_page_size: DEFAULT_ACCRUAL_PAGE_SIZE,
            accrual_time: NaiveTime::from_hms_opt(0, 10, 0).unwrap_or_default(),
            accrual_run_once: false,
            log_format: LogFormat::Json,
            use_persistent_stores: false,
            redis_url: "redis://localhost:6379".to_string(),
            products: vec![Product::new("SAV001", "Basic Savings")],
        }
    }
}

impl BankCoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("BANKCORE_BIND_ADDR") {
            cfg.bind_addr = parse("BANKCORE_BIND_ADDR", &v)?;
        }
        if let Some(v) = get("BANKCORE_TRANSFER_LOCK_STRATEGY") {
            cfg.transfer_strategy = v.parse().map_err(|message| ConfigError::Invalid {
                key: "BANKCORE_TRANSFER_LOCK_STRATEGY",
                message,
            })?;
        }
        if let Some(v) = get("BANKCORE_LOCK_TTL_MS") {
            cfg.lock_ttl = Duration::from_millis(parse("BANKCORE_LOCK_TTL_MS", &v)?);
        }
        if let Some(v) = get("BANKCORE_ROW_LOCK_TIMEOUT_MS") {
            cfg.row_lock_timeout = Duration::from_millis(parse("BANKCORE_ROW_LOCK_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("BANKCORE_IDEMPOTENCY_TTL_SECS") {
            cfg.idempotency_ttl = Duration::from_secs(parse("BANKCORE_IDEMPOTENCY_TTL_SECS", &v)?);
        }
        if let Some(v) = get("BANKCORE_TIMEZONE_OFFSET_HOURS") {
            let hours: i32 = parse("BANKCORE_TIMEZONE_OFFSET_HOURS", &v)?;
            if !(-23..=23).contains(&hours) {
                return Err(ConfigError::Invalid {
                    key: "BANKCORE_TIMEZONE_OFFSET_HOURS",
                    message: format!("{hours} is outside -23..=23"),
                });
            }
            cfg.timezone_offset_hours = hours;
        }
        if let Some(v) = get("BANKCORE_ACCRUAL_PAGE_SIZE") {
            let size: usize = parse("BANKCORE_ACCRUAL_PAGE_SIZE", &v)?;
            if size == 0 {
                return Err(ConfigError::Invalid {
                    key: "BANKCORE_ACCRUAL_PAGE_SIZE",
                    message: "must be positive".to_string(),
                });
            }
            cfg.accrual_page_size = size;
        }
        if let Some(v) = get("BANKCORE_ACCRUAL_TIME") {
            cfg.accrual_time = NaiveTime::parse_from_str(&v, "%H:%M").map_err(|e| {
                ConfigError::Invalid {
                    key: "BANKCORE_ACCRUAL_TIME",
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(v) = get("BANKCORE_ACCRUAL_RUN_ONCE") {
            cfg.accrual_run_once = parse("BANKCORE_ACCRUAL_RUN_ONCE", &v.to_ascii_lowercase())?;
        }
        if let Some(v) = get("BANKCORE_LOG_FORMAT") {
            cfg.log_format = v.parse().map_err(|message| ConfigError::Invalid {
                key: "BANKCORE_LOG_FORMAT",
                message,
            })?;
        }
        if let Some(v) = get("USE_PERSISTENT_STORES") {
            cfg.use_persistent_stores = v.parse::<bool>().unwrap_or(false);
        }
        if let Some(v) = get("REDIS_URL") {
            cfg.redis_url = v;
        }
        if let Some(v) = get("BANKCORE_PRODUCTS") {
            cfg.products = parse_products(&v)?;
        }

        Ok(cfg)
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            lease_ttl: self.lock_ttl,
            transfer_strategy: self.transfer_strategy,
            accrual_page_size: self.accrual_page_size,
        }
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        message: format!("{raw:?}: {e}"),
    })
}

/// `CODE|Name|max_accounts_per_customer` entries separated by `;`.
fn parse_products(raw: &str) -> Result<Vec<Product>, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        key: "BANKCORE_PRODUCTS",
        message,
    };
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
            let (code, name, max) = match parts.as_slice() {
                [code, name] => (*code, *name, 0),
                [code, name, max] => {
                    let max = max
                        .parse::<u32>()
                        .map_err(|e| invalid(format!("{entry:?}: {e}")))?;
                    (*code, *name, max)
                }
                _ => return Err(invalid(format!("malformed product entry {entry:?}"))),
            };
            let product = Product::new(code, name).with_max_accounts_per_customer(max);
            product.validate().map_err(|e| invalid(e.to_string()))?;
            Ok(product)
        })
        .collect()
}
