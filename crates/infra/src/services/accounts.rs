//! Account opening, single-account balance mutations and closing.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use bankcore_core::{AccountId, CustomerId};
use bankcore_ledger::{
    Account, AccountStatus, MAX_NUMBER_ATTEMPTS, NewAccount, NewTransaction, Transaction,
    TransactionType, account_number_candidate, generate_unique,
};

use crate::lock::domains;
use crate::store::UnitOfWork;

use super::error::{LedgerError, LedgerResult};
use super::settlement::SettlementService;
use super::LedgerContext;

/// Request to open an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAccount {
    pub customer_id: CustomerId,
    pub product_code: String,
    pub maturity_date: Option<NaiveDate>,
}

/// An account together with its product's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub account: Account,
    pub product_name: String,
}

#[derive(Clone)]
pub struct AccountService {
    ctx: LedgerContext,
    settlement: SettlementService,
}

impl AccountService {
    pub fn new(ctx: LedgerContext, settlement: SettlementService) -> Self {
        Self { ctx, settlement }
    }

    /// Open an ACTIVE zero-balance account.
    ///
    /// Serialized per (customer, product) so the per-customer account limit
    /// cannot be exceeded by concurrent openings.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, product_code = %request.product_code), err)]
    pub fn create_account(&self, request: OpenAccount) -> LedgerResult<AccountDetails> {
        let product_code = request.product_code.trim().to_string();
        if product_code.is_empty() {
            return Err(LedgerError::validation("product code cannot be blank"));
        }
        let lock_key = format!("{}:{}", request.customer_id, product_code);

        self.ctx
            .lock
            .execute_with_lock(domains::ACCOUNT, &lock_key, || {
                let product = self.ctx.store.find_product(&product_code)?.ok_or_else(|| {
                    LedgerError::validation(format!("unknown product code: {product_code}"))
                })?;

                if product.max_accounts_per_customer > 0 {
                    let active = self.ctx.store.count_accounts(
                        request.customer_id,
                        &product.code,
                        AccountStatus::Active,
                    )?;
                    product.ensure_capacity(active)?;
                }

                let mut rng = rand::thread_rng();
                let account_number = generate_unique(
                    || account_number_candidate(&mut rng),
                    |candidate| self.ctx.store.account_number_exists(candidate),
                    MAX_NUMBER_ATTEMPTS,
                )?
                .ok_or_else(|| LedgerError::Exhausted("account number".to_string()))?;

                let account = self.ctx.store.insert_account(NewAccount {
                    customer_id: request.customer_id,
                    account_number,
                    product_code: product.code.clone(),
                    maturity_date: request.maturity_date,
                    opened_at: self.ctx.clock.now(),
                })?;

                info!(account_id = %account.id, account_number = %account.account_number, "account opened");
                Ok(AccountDetails {
                    account,
                    product_name: product.name,
                })
            })
    }

    pub fn get_account(&self, id: AccountId) -> LedgerResult<AccountDetails> {
        let account = self.ctx.load_account(id)?;
        self.details(account)
    }

    pub fn list_transactions(&self, id: AccountId) -> LedgerResult<Vec<Transaction>> {
        self.ctx.load_account(id)?;
        Ok(self.ctx.store.list_transactions(id)?)
    }

    #[instrument(skip(self), fields(account_id = %id, amount = %amount), err)]
    pub fn deposit(&self, id: AccountId, amount: Decimal) -> LedgerResult<AccountDetails> {
        self.mutate_balance(id, amount, TransactionType::Deposit)
    }

    #[instrument(skip(self), fields(account_id = %id, amount = %amount), err)]
    pub fn withdraw(&self, id: AccountId, amount: Decimal) -> LedgerResult<AccountDetails> {
        self.mutate_balance(id, amount, TransactionType::Withdrawal)
    }

    /// Close a zero-balance account.
    ///
    /// Early-termination interest for today's business date is committed in the
    /// same unit of work that flips the account to CLOSED, so a failed close
    /// leaves no settlement behind.
    #[instrument(skip(self), fields(account_id = %id), err)]
    pub fn close(&self, id: AccountId) -> LedgerResult<AccountDetails> {
        self.ctx
            .lock
            .execute_with_lock(domains::ACCOUNT, &id.to_string(), || {
                let account = self.ctx.load_account(id)?;
                let mut closed = account.clone();
                closed.close(self.ctx.clock.now())?;

                let (settlement, committed) = self.settlement.settle_with(
                    &account,
                    self.ctx.clock.today(),
                    UnitOfWork::new().update_account(closed),
                )?;
                if settlement.settled && !settlement.already_processed {
                    info!(interest = %settlement.interest_amount, "early-termination interest settled");
                }

                let account = committed
                    .accounts
                    .into_iter()
                    .next()
                    .ok_or_else(|| LedgerError::not_found(format!("account {id} not found")))?;
                info!("account closed");
                self.details(account)
            })
    }

    fn mutate_balance(
        &self,
        id: AccountId,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> LedgerResult<AccountDetails> {
        self.ctx
            .lock
            .execute_with_lock(domains::ACCOUNT, &id.to_string(), || {
                let mut account = self.ctx.load_account(id)?;
                let now = self.ctx.clock.now();
                let balance_after = match transaction_type {
                    TransactionType::Withdrawal => account.withdraw(amount, now)?,
                    _ => account.deposit(amount, now)?,
                };

                let transaction_number = self
                    .ctx
                    .transaction_numbers(1)?
                    .pop()
                    .ok_or_else(|| LedgerError::Exhausted("transaction number".to_string()))?;
                let work = UnitOfWork::new()
                    .update_account(account)
                    .append_transaction(NewTransaction {
                        transaction_number,
                        account_id: id,
                        transaction_type,
                        amount,
                        balance_after,
                        transaction_at: now,
                    });

                let committed = self.ctx.store.commit(work)?;
                let account = committed
                    .accounts
                    .into_iter()
                    .next()
                    .ok_or_else(|| LedgerError::not_found(format!("account {id} not found")))?;
                self.details(account)
            })
    }

    fn details(&self, account: Account) -> LedgerResult<AccountDetails> {
        let product_name = self
            .ctx
            .store
            .find_product(&account.product_code)?
            .map(|p| p.name)
            .unwrap_or_default();
        Ok(AccountDetails {
            account,
            product_name,
        })
    }
}
