//! HTTP surface of the ledger: axum routes, idempotency middleware and the
//! daily accrual scheduler.

pub mod app;
pub mod middleware;
pub mod scheduler;
