//! Deposit ledger domain module.
//!
//! Entities and pure business rules for accounts, products, transactions,
//! interest rates and interest accrual. No IO, no locking, no storage: the
//! infra layer decides when these rules run and how their results are
//! persisted.

pub mod account;
pub mod interest;
pub mod numbering;
pub mod product;
pub mod rate;
pub mod transaction;

pub use account::{Account, AccountStatus, NewAccount, TransferOutcome, transfer_between};
pub use interest::{
    DAYS_IN_YEAR, InterestLog, InterestSettlement, NewInterestLog, RateComponents,
    SettlementType, daily_interest,
};
pub use numbering::{
    MAX_NUMBER_ATTEMPTS, account_number_candidate, generate_unique, transaction_number_candidate,
};
pub use product::Product;
pub use rate::{
    BaseRate, PreferentialRate, SpreadRate, normalize_condition_codes, validate_condition_code,
    validate_condition_codes, validate_rate_value,
};
pub use transaction::{NewTransaction, Transaction, TransactionType};
