//! `bankcore-core`: ledger foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, CustomerId, TransactionId};
pub use version::{ExpectedVersion, Versioned};
