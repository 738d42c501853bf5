//! Deposit account state machine.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bankcore_core::money::{self, check_positive};
use bankcore_core::{AccountId, CustomerId, DomainError, DomainResult, Versioned};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

/// Data needed to open an account before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub customer_id: CustomerId,
    pub account_number: String,
    pub product_code: String,
    pub maturity_date: Option<NaiveDate>,
    pub opened_at: DateTime<Utc>,
}

/// A deposit account.
///
/// Balance is kept at scale 2 and never goes negative. Once `CLOSED` the
/// account rejects every balance-changing operation. `version` is bumped by
/// the store on each committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: CustomerId,
    pub account_number: String,
    pub product_code: String,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub version: u64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub maturity_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for Account {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Account {
    /// Materialize a freshly inserted account: ACTIVE, zero balance, version 0.
    pub fn open(id: AccountId, new: NewAccount) -> Self {
        Self {
            id,
            customer_id: new.customer_id,
            account_number: new.account_number,
            product_code: new.product_code,
            balance: money::zero_money(),
            status: AccountStatus::Active,
            version: 0,
            opened_at: new.opened_at,
            closed_at: None,
            maturity_date: new.maturity_date,
            updated_at: new.opened_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn ensure_active(&self) -> DomainResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::conflict(format!("account {} is closed", self.id)))
        }
    }

    /// Calendar date of opening in the bank's local offset.
    pub fn opened_on(&self, offset: FixedOffset) -> NaiveDate {
        self.opened_at.with_timezone(&offset).date_naive()
    }

    pub fn closed_on(&self, offset: FixedOffset) -> Option<NaiveDate> {
        self.closed_at.map(|at| at.with_timezone(&offset).date_naive())
    }

    pub fn deposit(&mut self, amount: Decimal, at: DateTime<Utc>) -> DomainResult<Decimal> {
        self.ensure_active()?;
        check_positive("amount", amount)?;
        self.balance = money::money(self.balance + amount);
        self.updated_at = at;
        Ok(self.balance)
    }

    pub fn withdraw(&mut self, amount: Decimal, at: DateTime<Utc>) -> DomainResult<Decimal> {
        self.ensure_active()?;
        check_positive("amount", amount)?;
        self.ensure_funds(amount)?;
        self.balance = money::money(self.balance - amount);
        self.updated_at = at;
        Ok(self.balance)
    }

    /// Transition to CLOSED. Requires a zero balance.
    pub fn close(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::conflict(format!(
                "account {} is already closed",
                self.id
            )));
        }
        self.ensure_closable()?;
        self.status = AccountStatus::Closed;
        self.closed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    pub fn ensure_closable(&self) -> DomainResult<()> {
        if !self.balance.is_zero() {
            return Err(DomainError::conflict(format!(
                "account {} balance must be zero to close (current: {})",
                self.id, self.balance
            )));
        }
        Ok(())
    }

    /// Whether interest may be accrued for `business_date`.
    pub fn ensure_accruable_on(
        &self,
        business_date: NaiveDate,
        offset: FixedOffset,
    ) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::conflict(format!(
                "account {} is closed; interest cannot be accrued",
                self.id
            )));
        }
        if business_date < self.opened_on(offset) {
            return Err(DomainError::conflict(format!(
                "business date {business_date} is before account {} was opened",
                self.id
            )));
        }
        if let Some(closed_on) = self.closed_on(offset) {
            if business_date > closed_on {
                return Err(DomainError::conflict(format!(
                    "business date {business_date} is after account {} was closed",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Early termination applies only to accounts closed before their maturity date.
    pub fn is_early_termination(&self, close_date: NaiveDate) -> bool {
        matches!(self.maturity_date, Some(maturity) if close_date < maturity)
    }

    fn ensure_funds(&self, amount: Decimal) -> DomainResult<()> {
        if self.balance < amount {
            return Err(DomainError::conflict(format!(
                "insufficient balance in account {} (balance: {}, requested: {})",
                self.id, self.balance, amount
            )));
        }
        Ok(())
    }
}

/// Resulting balances of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

/// Move `amount` from `from` to `to`.
///
/// Checks run in a fixed order: source closed, destination closed, funds.
/// Nothing is mutated unless every check passes.
pub fn transfer_between(
    from: &mut Account,
    to: &mut Account,
    amount: Decimal,
    at: DateTime<Utc>,
) -> DomainResult<TransferOutcome> {
    if from.id == to.id {
        return Err(DomainError::validation(
            "source and destination accounts must differ",
        ));
    }
    check_positive("amount", amount)?;
    from.ensure_active()?;
    to.ensure_active()?;
    from.ensure_funds(amount)?;

    from.balance = money::money(from.balance - amount);
    to.balance = money::money(to.balance + amount);
    from.updated_at = at;
    to.updated_at = at;

    Ok(TransferOutcome {
        from_balance: from.balance,
        to_balance: to.balance,
    })
}
