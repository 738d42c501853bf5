use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use bankcore_core::{AccountId, CustomerId, ExpectedVersion};
use bankcore_ledger::{
    Account, AccountStatus, BaseRate, InterestLog, InterestSettlement, NewAccount,
    NewInterestLog, NewTransaction, PreferentialRate, Product, SettlementType, SpreadRate,
    Transaction,
};

/// Ledger store operation error.
///
/// `UniqueViolation` is kept distinguishable on purpose: accrual and settlement
/// treat it as "someone else already wrote this row".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("stale version: {0}")]
    VersionConflict(String),

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("row lock timed out: {0}")]
    LockTimeout(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Pessimistic row locks held until dropped.
pub struct RowLockGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl RowLockGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for RowLockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl core::fmt::Debug for RowLockGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RowLockGuard")
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// An account write guarded by the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub account: Account,
    pub expected: ExpectedVersion,
}

/// Writes applied atomically by [`LedgerStore::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    pub account_updates: Vec<AccountUpdate>,
    pub transactions: Vec<NewTransaction>,
    pub settlement: Option<InterestSettlement>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist `account`, expecting the stored row to still be at `account.version`.
    pub fn update_account(mut self, account: Account) -> Self {
        let expected = ExpectedVersion::of(&account);
        self.account_updates.push(AccountUpdate { account, expected });
        self
    }

    pub fn append_transaction(mut self, transaction: NewTransaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn record_settlement(mut self, settlement: InterestSettlement) -> Self {
        self.settlement = Some(settlement);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.account_updates.is_empty() && self.transactions.is_empty() && self.settlement.is_none()
    }
}

/// Rows as persisted by a successful commit (versions bumped, ids assigned).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Committed {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Repository contract for the deposit ledger.
///
/// ## Implementation Requirements
///
/// - `commit` is all-or-nothing: version checks and uniqueness checks run before
///   anything is written
/// - every successful account write bumps `version` by one
/// - `insert_*` report duplicates as [`StoreError::UniqueViolation`]
/// - `lock_accounts_for_update` acquires in the order given and blocks (bounded)
///   while another holder owns a row
pub trait LedgerStore: Send + Sync {
    // Products
    fn insert_product(&self, product: Product) -> Result<(), StoreError>;
    fn find_product(&self, code: &str) -> Result<Option<Product>, StoreError>;

    // Accounts
    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    fn account_number_exists(&self, account_number: &str) -> Result<bool, StoreError>;
    fn count_accounts(
        &self,
        customer_id: CustomerId,
        product_code: &str,
        status: AccountStatus,
    ) -> Result<u64, StoreError>;
    /// Accounts with `status`, ascending by id, strictly after `after`.
    fn list_accounts_by_status(
        &self,
        status: AccountStatus,
        after: Option<AccountId>,
        limit: usize,
    ) -> Result<Vec<Account>, StoreError>;
    fn lock_accounts_for_update(&self, ids: &[AccountId]) -> Result<RowLockGuard, StoreError>;

    // Transactions
    fn transaction_number_exists(&self, transaction_number: &str) -> Result<bool, StoreError>;
    fn list_transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>, StoreError>;

    // Rates
    fn insert_base_rate(&self, rate: BaseRate) -> Result<(), StoreError>;
    fn find_base_rate(&self, business_date: NaiveDate) -> Result<Option<BaseRate>, StoreError>;
    fn insert_spread_rate(&self, rate: SpreadRate) -> Result<(), StoreError>;
    fn find_active_spread_rate(
        &self,
        product_code: &str,
        business_date: NaiveDate,
    ) -> Result<Option<SpreadRate>, StoreError>;
    fn insert_preferential_rate(&self, rate: PreferentialRate) -> Result<(), StoreError>;
    /// Sum of active preferential rates for the product, date and any of `condition_codes`.
    fn sum_active_preferential_rates(
        &self,
        product_code: &str,
        condition_codes: &[String],
        business_date: NaiveDate,
    ) -> Result<Decimal, StoreError>;

    // Interest
    fn find_interest_log(
        &self,
        account_id: AccountId,
        business_date: NaiveDate,
    ) -> Result<Option<InterestLog>, StoreError>;
    fn insert_interest_log(&self, log: NewInterestLog) -> Result<InterestLog, StoreError>;
    /// Sum of interest amounts for business dates in `from..=to`.
    fn sum_interest_between(
        &self,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Decimal, StoreError>;
    fn find_settlement(
        &self,
        account_id: AccountId,
        settlement_type: SettlementType,
    ) -> Result<Option<InterestSettlement>, StoreError>;

    fn commit(&self, work: UnitOfWork) -> Result<Committed, StoreError>;
}
