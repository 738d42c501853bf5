//! Infrastructure layer: lock and idempotency stores, ledger persistence,
//! ledger services and configuration.

pub mod config;
pub mod idempotency;
pub mod kv;
pub mod lock;
pub mod services;
pub mod store;
