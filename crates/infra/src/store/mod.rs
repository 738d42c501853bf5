//! Ledger repository boundary.
//!
//! Services talk to persistence only through [`LedgerStore`]. Writes that must
//! land together (balance updates, their transactions, a settlement) go through
//! a single [`UnitOfWork`] so a failure never leaves half of them behind.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{AccountUpdate, Committed, LedgerStore, RowLockGuard, StoreError, UnitOfWork};
