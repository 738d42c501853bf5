//! Early-termination interest settlement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use bankcore_core::money;
use bankcore_ledger::{
    Account, InterestSettlement, NewTransaction, SettlementType, TransactionType,
};

use crate::lock::domains;
use crate::store::{Committed, UnitOfWork};

use super::error::{LedgerError, LedgerResult};
use super::interest::InterestAccrualService;
use super::LedgerContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementResult {
    /// The account was not eligible (no maturity date, or closed on/after it).
    pub skipped: bool,
    /// A settlement exists for the account, written by this call or an earlier one.
    pub settled: bool,
    /// An earlier call wrote the settlement; nothing new was written.
    pub already_processed: bool,
    pub settlement_type: SettlementType,
    pub business_date: NaiveDate,
    pub interest_amount: Decimal,
}

impl SettlementResult {
    fn skipped(business_date: NaiveDate) -> Self {
        Self {
            skipped: true,
            settled: false,
            already_processed: false,
            settlement_type: SettlementType::EarlyTermination,
            business_date,
            interest_amount: money::zero_money(),
        }
    }

    fn existing(settlement: InterestSettlement) -> Self {
        Self {
            skipped: false,
            settled: true,
            already_processed: true,
            settlement_type: settlement.settlement_type,
            business_date: settlement.business_date,
            interest_amount: settlement.interest_amount,
        }
    }
}

#[derive(Clone)]
pub struct SettlementService {
    ctx: LedgerContext,
    accrual: InterestAccrualService,
}

impl SettlementService {
    pub fn new(ctx: LedgerContext, accrual: InterestAccrualService) -> Self {
        Self { ctx, accrual }
    }

    /// Settle cumulative interest for an account closed before maturity.
    ///
    /// Accrues `close_date` first, then records the sum of every daily log from
    /// the opening date through `close_date` together with an
    /// `INTEREST_SETTLEMENT` transaction. At most one settlement per account.
    pub fn settle_on_close(
        &self,
        account: &Account,
        close_date: NaiveDate,
    ) -> LedgerResult<SettlementResult> {
        self.settle_with(account, close_date, UnitOfWork::new())
            .map(|(result, _)| result)
    }

    /// Settle as [`settle_on_close`](Self::settle_on_close) does, committing
    /// `work` in the same unit of work as the settlement.
    ///
    /// `work` is committed on its own when the account is skipped or already
    /// settled. If the commit fails, neither `work` nor the settlement is written.
    #[instrument(skip(self, account, work), fields(account_id = %account.id, close_date = %close_date), err)]
    pub(crate) fn settle_with(
        &self,
        account: &Account,
        close_date: NaiveDate,
        work: UnitOfWork,
    ) -> LedgerResult<(SettlementResult, Committed)> {
        if !account.is_early_termination(close_date) {
            let committed = self.ctx.store.commit(work)?;
            return Ok((SettlementResult::skipped(close_date), committed));
        }

        let settlement_type = SettlementType::EarlyTermination;
        let lock_key = format!("{}:{}", account.id, settlement_type.as_str());

        self.ctx
            .lock
            .execute_with_lock(domains::INTEREST_SETTLEMENT, &lock_key, || {
                if let Some(existing) = self.ctx.store.find_settlement(account.id, settlement_type)? {
                    let committed = self.ctx.store.commit(work)?;
                    return Ok((SettlementResult::existing(existing), committed));
                }

                self.accrual.accrue_daily_interest(account.id, close_date, &[])?;

                let opened_on = account.opened_on(self.ctx.clock.offset());
                let total = money::money(self.ctx.store.sum_interest_between(
                    account.id,
                    opened_on,
                    close_date,
                )?);

                let current = self.ctx.load_account(account.id)?;
                let now = self.ctx.clock.now();
                let transaction_number = self
                    .ctx
                    .transaction_numbers(1)?
                    .pop()
                    .ok_or_else(|| LedgerError::Exhausted("transaction number".to_string()))?;

                let combined = work
                    .clone()
                    .record_settlement(InterestSettlement {
                        account_id: account.id,
                        settlement_type,
                        business_date: close_date,
                        interest_amount: total,
                        created_at: now,
                    })
                    .append_transaction(NewTransaction {
                        transaction_number,
                        account_id: account.id,
                        transaction_type: TransactionType::InterestSettlement,
                        amount: total,
                        balance_after: current.balance,
                        transaction_at: now,
                    });

                let err = match self.ctx.store.commit(combined) {
                    Ok(committed) => {
                        let result = SettlementResult {
                            skipped: false,
                            settled: true,
                            already_processed: false,
                            settlement_type,
                            business_date: close_date,
                            interest_amount: total,
                        };
                        return Ok((result, committed));
                    }
                    Err(e) => LedgerError::from(e),
                };
                if !err.is_unique_violation() {
                    return Err(err);
                }

                debug!("concurrent settlement won the insert");
                match self.ctx.store.find_settlement(account.id, settlement_type)? {
                    Some(existing) => {
                        let committed = self.ctx.store.commit(work)?;
                        Ok((SettlementResult::existing(existing), committed))
                    }
                    None => Err(err),
                }
            })
    }
}
