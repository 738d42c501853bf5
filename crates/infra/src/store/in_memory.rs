use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use bankcore_core::money;
use bankcore_core::{AccountId, CustomerId, TransactionId};
use bankcore_ledger::{
    Account, AccountStatus, BaseRate, InterestLog, InterestSettlement, NewAccount,
    NewInterestLog, PreferentialRate, Product, SettlementType, SpreadRate, Transaction,
};

use super::r#trait::{Committed, LedgerStore, RowLockGuard, StoreError, UnitOfWork};

const DEFAULT_ROW_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<String, Product>,
    accounts: BTreeMap<AccountId, Account>,
    account_numbers: HashSet<String>,
    next_account_id: i64,
    transactions: Vec<Transaction>,
    transaction_numbers: HashSet<String>,
    next_transaction_id: i64,
    base_rates: HashMap<NaiveDate, BaseRate>,
    spread_rates: Vec<SpreadRate>,
    preferential_rates: Vec<PreferentialRate>,
    interest_logs: HashMap<(AccountId, NaiveDate), InterestLog>,
    next_interest_log_id: i64,
    settlements: HashMap<(AccountId, SettlementType), InterestSettlement>,
}

/// Row-level "select for update" emulation.
///
/// The held set stays consistent across panics, so a poisoned mutex is
/// recovered rather than leaving rows locked forever.
#[derive(Debug, Default)]
struct RowLocks {
    held: Mutex<HashSet<AccountId>>,
    released: Condvar,
}

impl RowLocks {
    fn acquire(
        self: &Arc<Self>,
        ids: &[AccountId],
        timeout: Duration,
    ) -> Result<RowLockGuard, StoreError> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let mut acquired: Vec<AccountId> = Vec::with_capacity(ids.len());

        for id in ids {
            if acquired.contains(id) {
                continue;
            }
            while held.contains(id) {
                let now = Instant::now();
                if now >= deadline {
                    for a in &acquired {
                        held.remove(a);
                    }
                    self.released.notify_all();
                    return Err(StoreError::LockTimeout(format!("account {id}")));
                }
                let (guard, _) = self
                    .released
                    .wait_timeout(held, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner);
                held = guard;
            }
            held.insert(*id);
            acquired.push(*id);
        }
        drop(held);

        let table = Arc::clone(self);
        Ok(RowLockGuard::new(move || table.release(&acquired)))
    }

    fn release(&self, ids: &[AccountId]) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            held.remove(id);
        }
        drop(held);
        self.released.notify_all();
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. All tables sit behind one `RwLock` so that a
/// [`UnitOfWork`] is validated and applied under a single write guard.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
    row_locks: Arc<RowLocks>,
    row_lock_timeout: Duration,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_row_lock_timeout(DEFAULT_ROW_LOCK_TIMEOUT)
    }

    pub fn with_row_lock_timeout(row_lock_timeout: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            row_locks: Arc::new(RowLocks::default()),
            row_lock_timeout,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.products.contains_key(&product.code) {
            return Err(StoreError::UniqueViolation(format!(
                "product code {}",
                product.code
            )));
        }
        t.products.insert(product.code.clone(), product);
        Ok(())
    }

    fn find_product(&self, code: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(code).cloned())
    }

    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut t = self.write()?;
        if t.account_numbers.contains(&account.account_number) {
            return Err(StoreError::UniqueViolation(format!(
                "account number {}",
                account.account_number
            )));
        }
        t.next_account_id += 1;
        let id = AccountId::new(t.next_account_id);
        let account = Account::open(id, account);
        t.account_numbers.insert(account.account_number.clone());
        t.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn account_number_exists(&self, account_number: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.account_numbers.contains(account_number))
    }

    fn count_accounts(
        &self,
        customer_id: CustomerId,
        product_code: &str,
        status: AccountStatus,
    ) -> Result<u64, StoreError> {
        let t = self.read()?;
        let count = t
            .accounts
            .values()
            .filter(|a| {
                a.customer_id == customer_id && a.product_code == product_code && a.status == status
            })
            .count();
        Ok(count as u64)
    }

    fn list_accounts_by_status(
        &self,
        status: AccountStatus,
        after: Option<AccountId>,
        limit: usize,
    ) -> Result<Vec<Account>, StoreError> {
        let t = self.read()?;
        let page = t
            .accounts
            .values()
            .filter(|a| after.is_none_or(|cursor| a.id > cursor))
            .filter(|a| a.status == status)
            .take(limit)
            .cloned()
            .collect();
        Ok(page)
    }

    fn lock_accounts_for_update(&self, ids: &[AccountId]) -> Result<RowLockGuard, StoreError> {
        self.row_locks.acquire(ids, self.row_lock_timeout)
    }

    fn transaction_number_exists(&self, transaction_number: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.transaction_numbers.contains(transaction_number))
    }

    fn list_transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>, StoreError> {
        let t = self.read()?;
        Ok(t.transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect())
    }

    fn insert_base_rate(&self, rate: BaseRate) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.base_rates.contains_key(&rate.business_date) {
            return Err(StoreError::UniqueViolation(format!(
                "base rate for {}",
                rate.business_date
            )));
        }
        t.base_rates.insert(rate.business_date, rate);
        Ok(())
    }

    fn find_base_rate(&self, business_date: NaiveDate) -> Result<Option<BaseRate>, StoreError> {
        Ok(self.read()?.base_rates.get(&business_date).cloned())
    }

    fn insert_spread_rate(&self, rate: SpreadRate) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let duplicate = rate.active
            && t.spread_rates.iter().any(|r| {
                r.active
                    && r.product_code == rate.product_code
                    && r.business_date == rate.business_date
            });
        if duplicate {
            return Err(StoreError::UniqueViolation(format!(
                "spread rate for {} on {}",
                rate.product_code, rate.business_date
            )));
        }
        t.spread_rates.push(rate);
        Ok(())
    }

    fn find_active_spread_rate(
        &self,
        product_code: &str,
        business_date: NaiveDate,
    ) -> Result<Option<SpreadRate>, StoreError> {
        let t = self.read()?;
        Ok(t.spread_rates
            .iter()
            .find(|r| r.active && r.product_code == product_code && r.business_date == business_date)
            .cloned())
    }

    fn insert_preferential_rate(&self, rate: PreferentialRate) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let duplicate = rate.active
            && t.preferential_rates.iter().any(|r| {
                r.active
                    && r.product_code == rate.product_code
                    && r.condition_code == rate.condition_code
                    && r.business_date == rate.business_date
            });
        if duplicate {
            return Err(StoreError::UniqueViolation(format!(
                "preferential rate for {}/{} on {}",
                rate.product_code, rate.condition_code, rate.business_date
            )));
        }
        t.preferential_rates.push(rate);
        Ok(())
    }

    fn sum_active_preferential_rates(
        &self,
        product_code: &str,
        condition_codes: &[String],
        business_date: NaiveDate,
    ) -> Result<Decimal, StoreError> {
        if condition_codes.is_empty() {
            return Ok(money::zero_rate());
        }
        let t = self.read()?;
        let sum: Decimal = t
            .preferential_rates
            .iter()
            .filter(|r| {
                r.active
                    && r.product_code == product_code
                    && r.business_date == business_date
                    && condition_codes.contains(&r.condition_code)
            })
            .map(|r| r.rate)
            .sum();
        Ok(money::rate(sum))
    }

    fn find_interest_log(
        &self,
        account_id: AccountId,
        business_date: NaiveDate,
    ) -> Result<Option<InterestLog>, StoreError> {
        Ok(self
            .read()?
            .interest_logs
            .get(&(account_id, business_date))
            .cloned())
    }

    fn insert_interest_log(&self, log: NewInterestLog) -> Result<InterestLog, StoreError> {
        let mut t = self.write()?;
        let key = (log.account_id, log.business_date);
        if t.interest_logs.contains_key(&key) {
            return Err(StoreError::UniqueViolation(format!(
                "interest log for account {} on {}",
                log.account_id, log.business_date
            )));
        }
        t.next_interest_log_id += 1;
        let stored = InterestLog::from_new(t.next_interest_log_id, log, Utc::now());
        t.interest_logs.insert(key, stored.clone());
        Ok(stored)
    }

    fn sum_interest_between(
        &self,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Decimal, StoreError> {
        let t = self.read()?;
        let sum: Decimal = t
            .interest_logs
            .values()
            .filter(|l| l.account_id == account_id && l.business_date >= from && l.business_date <= to)
            .map(|l| l.interest_amount)
            .sum();
        Ok(money::money(sum))
    }

    fn find_settlement(
        &self,
        account_id: AccountId,
        settlement_type: SettlementType,
    ) -> Result<Option<InterestSettlement>, StoreError> {
        Ok(self
            .read()?
            .settlements
            .get(&(account_id, settlement_type))
            .cloned())
    }

    fn commit(&self, work: UnitOfWork) -> Result<Committed, StoreError> {
        if work.is_empty() {
            return Ok(Committed::default());
        }

        let mut t = self.write()?;

        // Validate everything before touching any table.
        for update in &work.account_updates {
            let stored = t
                .accounts
                .get(&update.account.id)
                .ok_or_else(|| StoreError::NotFound(format!("account {}", update.account.id)))?;
            if !update.expected.matches(stored.version) {
                return Err(StoreError::VersionConflict(format!(
                    "account {} expected {:?}, found {}",
                    update.account.id, update.expected, stored.version
                )));
            }
        }
        let mut batch_numbers: HashSet<&str> = HashSet::new();
        for tx in &work.transactions {
            if t.transaction_numbers.contains(&tx.transaction_number)
                || !batch_numbers.insert(tx.transaction_number.as_str())
            {
                return Err(StoreError::UniqueViolation(format!(
                    "transaction number {}",
                    tx.transaction_number
                )));
            }
        }
        if let Some(settlement) = &work.settlement {
            if t
                .settlements
                .contains_key(&(settlement.account_id, settlement.settlement_type))
            {
                return Err(StoreError::UniqueViolation(format!(
                    "{} settlement for account {}",
                    settlement.settlement_type.as_str(),
                    settlement.account_id
                )));
            }
        }

        let mut committed = Committed::default();
        for update in work.account_updates {
            let mut account = update.account;
            account.version += 1;
            t.accounts.insert(account.id, account.clone());
            committed.accounts.push(account);
        }
        for tx in work.transactions {
            t.next_transaction_id += 1;
            let stored = Transaction::from_new(TransactionId::new(t.next_transaction_id), tx);
            t.transaction_numbers.insert(stored.transaction_number.clone());
            t.transactions.push(stored.clone());
            committed.transactions.push(stored);
        }
        if let Some(settlement) = work.settlement {
            t.settlements
                .insert((settlement.account_id, settlement.settlement_type), settlement);
        }

        Ok(committed)
    }
}
