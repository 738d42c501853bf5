//! Daily interest accrual.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use bankcore_core::AccountId;
use bankcore_ledger::{InterestLog, NewInterestLog, RateComponents, normalize_condition_codes};

use crate::lock::domains;

use super::error::{LedgerError, LedgerResult};
use super::LedgerContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualResult {
    pub account_id: AccountId,
    pub business_date: NaiveDate,
    pub base_rate: Decimal,
    pub spread_rate: Decimal,
    pub preferential_rate: Decimal,
    pub applied_rate: Decimal,
    pub balance_snapshot: Decimal,
    pub interest_amount: Decimal,
    /// `true` when an earlier call already wrote the log for this date.
    pub already_processed: bool,
}

impl AccrualResult {
    fn from_log(log: InterestLog, already_processed: bool) -> Self {
        Self {
            account_id: log.account_id,
            business_date: log.business_date,
            base_rate: log.base_rate,
            spread_rate: log.spread_rate,
            preferential_rate: log.preferential_rate,
            applied_rate: log.applied_rate,
            balance_snapshot: log.balance_snapshot,
            interest_amount: log.interest_amount,
            already_processed,
        }
    }
}

#[derive(Clone)]
pub struct InterestAccrualService {
    ctx: LedgerContext,
}

impl InterestAccrualService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Accrue one day's interest for `account_id` on `business_date`.
    ///
    /// At most one log exists per (account, date). Repeated or concurrent calls
    /// return the first call's figures with `already_processed = true`.
    #[instrument(skip(self, condition_codes), fields(account_id = %account_id, business_date = %business_date), err)]
    pub fn accrue_daily_interest(
        &self,
        account_id: AccountId,
        business_date: NaiveDate,
        condition_codes: &[String],
    ) -> LedgerResult<AccrualResult> {
        if let Some(log) = self.ctx.store.find_interest_log(account_id, business_date)? {
            return Ok(AccrualResult::from_log(log, true));
        }

        let lock_key = format!("{account_id}:{business_date}");
        self.ctx
            .lock
            .execute_with_lock(domains::INTEREST_ACCRUAL, &lock_key, || {
                if let Some(log) = self.ctx.store.find_interest_log(account_id, business_date)? {
                    return Ok(AccrualResult::from_log(log, true));
                }

                let account = self.ctx.load_account(account_id)?;
                account.ensure_accruable_on(business_date, self.ctx.clock.offset())?;

                let codes = normalize_condition_codes(condition_codes);
                let rates = self.rate_components(&account.product_code, business_date, &codes)?;
                let log = NewInterestLog::compute(account_id, business_date, rates, account.balance);

                let err = match self.ctx.store.insert_interest_log(log) {
                    Ok(stored) => return Ok(AccrualResult::from_log(stored, false)),
                    Err(e) => LedgerError::from(e),
                };
                if !err.is_unique_violation() {
                    return Err(err);
                }

                debug!("concurrent accrual won the insert");
                match self.ctx.store.find_interest_log(account_id, business_date)? {
                    Some(existing) => Ok(AccrualResult::from_log(existing, true)),
                    None => Err(err),
                }
            })
    }

    fn rate_components(
        &self,
        product_code: &str,
        business_date: NaiveDate,
        condition_codes: &[String],
    ) -> LedgerResult<RateComponents> {
        let base = self
            .ctx
            .store
            .find_base_rate(business_date)?
            .ok_or_else(|| {
                LedgerError::conflict(format!("base rate is not registered for {business_date}"))
            })?;
        let spread = self
            .ctx
            .store
            .find_active_spread_rate(product_code, business_date)?
            .ok_or_else(|| {
                LedgerError::conflict(format!(
                    "spread rate is not registered for {product_code} on {business_date}"
                ))
            })?;
        let preferential =
            self.ctx
                .store
                .sum_active_preferential_rates(product_code, condition_codes, business_date)?;

        Ok(RateComponents {
            base: base.rate,
            spread: spread.rate,
            preferential,
        })
    }
}
