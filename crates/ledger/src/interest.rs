//! Daily interest calculation and the records it produces.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bankcore_core::AccountId;
use bankcore_core::money;

/// Day-count basis for daily interest (Actual/365).
pub const DAYS_IN_YEAR: u32 = 365;

/// Rate components for one account on one business date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateComponents {
    pub base: Decimal,
    pub spread: Decimal,
    /// Sum of matching preferential rates (zero when none apply).
    pub preferential: Decimal,
}

impl RateComponents {
    /// `base + spread + preferential`, truncated to 4 fraction digits.
    pub fn applied(&self) -> Decimal {
        money::rate(self.base + self.spread + self.preferential)
    }
}

/// `balance * applied_rate / 365`, truncated to 2 fraction digits.
pub fn daily_interest(balance: Decimal, applied_rate: Decimal) -> Decimal {
    money::money(balance * applied_rate / Decimal::from(DAYS_IN_YEAR))
}

/// Interest log ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInterestLog {
    pub account_id: AccountId,
    pub business_date: NaiveDate,
    pub base_rate: Decimal,
    pub spread_rate: Decimal,
    pub preferential_rate: Decimal,
    pub applied_rate: Decimal,
    pub balance_snapshot: Decimal,
    pub interest_amount: Decimal,
}

impl NewInterestLog {
    pub fn compute(
        account_id: AccountId,
        business_date: NaiveDate,
        rates: RateComponents,
        balance: Decimal,
    ) -> Self {
        let applied_rate = rates.applied();
        Self {
            account_id,
            business_date,
            base_rate: money::rate(rates.base),
            spread_rate: money::rate(rates.spread),
            preferential_rate: money::rate(rates.preferential),
            applied_rate,
            balance_snapshot: money::money(balance),
            interest_amount: daily_interest(balance, applied_rate),
        }
    }
}

/// One row per (account, business date). Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestLog {
    pub id: i64,
    pub account_id: AccountId,
    pub business_date: NaiveDate,
    pub base_rate: Decimal,
    pub spread_rate: Decimal,
    pub preferential_rate: Decimal,
    pub applied_rate: Decimal,
    pub balance_snapshot: Decimal,
    pub interest_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InterestLog {
    pub fn from_new(id: i64, new: NewInterestLog, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id: new.account_id,
            business_date: new.business_date,
            base_rate: new.base_rate,
            spread_rate: new.spread_rate,
            preferential_rate: new.preferential_rate,
            applied_rate: new.applied_rate,
            balance_snapshot: new.balance_snapshot,
            interest_amount: new.interest_amount,
            created_at,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementType {
    EarlyTermination,
}

impl SettlementType {
    pub fn as_str(self) -> &'static str {
        match self {
            SettlementType::EarlyTermination => "EARLY_TERMINATION",
        }
    }
}

/// One row per (account, settlement type). Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestSettlement {
    pub account_id: AccountId,
    pub settlement_type: SettlementType,
    pub business_date: NaiveDate,
    pub interest_amount: Decimal,
    pub created_at: DateTime<Utc>,
}
