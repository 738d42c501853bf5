//! Daily interest accrual over every active account.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use bankcore_core::AccountId;
use bankcore_ledger::AccountStatus;

use super::error::LedgerResult;
use super::interest::InterestAccrualService;
use super::LedgerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccrualBatchReport {
    pub business_date: NaiveDate,
    /// Logs written by this run.
    pub processed: u64,
    /// Accounts already accrued for the date before this run reached them.
    pub already_processed: u64,
    pub failures: u64,
}

impl AccrualBatchReport {
    fn new(business_date: NaiveDate) -> Self {
        Self {
            business_date,
            processed: 0,
            already_processed: 0,
            failures: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.processed + self.already_processed + self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

#[derive(Clone)]
pub struct DailyAccrualBatch {
    ctx: LedgerContext,
    accrual: InterestAccrualService,
    page_size: usize,
}

impl DailyAccrualBatch {
    pub fn new(ctx: LedgerContext, accrual: InterestAccrualService, page_size: usize) -> Self {
        Self {
            ctx,
            accrual,
            page_size: page_size.max(1),
        }
    }

    /// Accrue `business_date` for every ACTIVE account, in ascending id order.
    ///
    /// Per-account failures are logged and counted; they never stop the run.
    /// Store failures while paging abort it.
    #[instrument(skip(self), fields(business_date = %business_date, page_size = self.page_size), err)]
    pub fn run_daily_accrual_batch(&self, business_date: NaiveDate) -> LedgerResult<AccrualBatchReport> {
        let mut report = AccrualBatchReport::new(business_date);
        let mut cursor: Option<AccountId> = None;

        loop {
            let page = self.ctx.store.list_accounts_by_status(
                AccountStatus::Active,
                cursor,
                self.page_size,
            )?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id);

            for account in &page {
                match self.accrual.accrue_daily_interest(account.id, business_date, &[]) {
                    Ok(result) if result.already_processed => report.already_processed += 1,
                    Ok(_) => report.processed += 1,
                    Err(err) => {
                        report.failures += 1;
                        warn!(account_id = %account.id, error = %err, "daily accrual failed");
                    }
                }
            }

            if page.len() < self.page_size {
                break;
            }
        }

        info!(
            processed = report.processed,
            already_processed = report.already_processed,
            failures = report.failures,
            "daily accrual batch finished"
        );
        Ok(report)
    }
}
