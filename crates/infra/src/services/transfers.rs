//! Account-to-account transfers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use bankcore_core::AccountId;
use bankcore_core::money::check_positive;
use bankcore_ledger::{NewTransaction, TransactionType, transfer_between};

use crate::lock::domains;
use crate::store::UnitOfWork;

use super::error::{LedgerError, LedgerResult};
use super::LedgerContext;

/// How a transfer serializes against other mutations of the same accounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransferLockStrategy {
    /// Lease on `lock:account:{min}:{max}` in the shared key-value store.
    #[default]
    Distributed,
    /// Row locks on both accounts in the ledger store, ascending id order.
    Pessimistic,
}

impl TransferLockStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferLockStrategy::Distributed => "DISTRIBUTED",
            TransferLockStrategy::Pessimistic => "PESSIMISTIC",
        }
    }
}

impl core::fmt::Display for TransferLockStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferLockStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DISTRIBUTED" => Ok(Self::Distributed),
            "PESSIMISTIC" => Ok(Self::Pessimistic),
            other => Err(format!("unknown transfer lock strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
    pub transferred_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TransferService {
    ctx: LedgerContext,
    strategy: TransferLockStrategy,
}

impl TransferService {
    pub fn new(ctx: LedgerContext, strategy: TransferLockStrategy) -> Self {
        Self { ctx, strategy }
    }

    pub fn strategy(&self) -> TransferLockStrategy {
        self.strategy
    }

    /// Move `amount` between two accounts. Both legs commit together or not at all.
    #[instrument(skip(self), fields(from = %from, to = %to, amount = %amount, strategy = %self.strategy), err)]
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> LedgerResult<TransferReceipt> {
        if from == to {
            return Err(LedgerError::validation(
                "source and destination accounts must differ",
            ));
        }
        check_positive("amount", amount)?;

        // Ascending order regardless of direction, so A->B and B->A contend on the same locks.
        let (low, high) = if from < to { (from, to) } else { (to, from) };

        match self.strategy {
            TransferLockStrategy::Distributed => self.ctx.lock.execute_with_lock(
                domains::ACCOUNT,
                &format!("{low}:{high}"),
                || self.apply(from, to, amount),
            ),
            TransferLockStrategy::Pessimistic => {
                let _rows = self.ctx.store.lock_accounts_for_update(&[low, high])?;
                self.apply(from, to, amount)
            }
        }
    }

    fn apply(&self, from: AccountId, to: AccountId, amount: Decimal) -> LedgerResult<TransferReceipt> {
        let mut source = self
            .ctx
            .store
            .find_account(from)?
            .ok_or_else(|| LedgerError::not_found(format!("source account {from} not found")))?;
        let mut destination = self.ctx.store.find_account(to)?.ok_or_else(|| {
            LedgerError::not_found(format!("destination account {to} not found"))
        })?;

        let now = self.ctx.clock.now();
        let outcome = transfer_between(&mut source, &mut destination, amount, now)?;

        let mut numbers = self.ctx.transaction_numbers(2)?.into_iter();
        let (Some(out_number), Some(in_number)) = (numbers.next(), numbers.next()) else {
            return Err(LedgerError::Exhausted("transaction number".to_string()));
        };

        let work = UnitOfWork::new()
            .update_account(source)
            .update_account(destination)
            .append_transaction(NewTransaction {
                transaction_number: out_number,
                account_id: from,
                transaction_type: TransactionType::TransferOut,
                amount,
                balance_after: outcome.from_balance,
                transaction_at: now,
            })
            .append_transaction(NewTransaction {
                transaction_number: in_number,
                account_id: to,
                transaction_type: TransactionType::TransferIn,
                amount,
                balance_after: outcome.to_balance,
                transaction_at: now,
            });
        self.ctx.store.commit(work)?;

        info!(from_balance = %outcome.from_balance, to_balance = %outcome.to_balance, "transfer committed");
        Ok(TransferReceipt {
            from_account_id: from,
            to_account_id: to,
            amount,
            from_balance: outcome.from_balance,
            to_balance: outcome.to_balance,
            transferred_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(
            "pessimistic".parse::<TransferLockStrategy>().unwrap(),
            TransferLockStrategy::Pessimistic
        );
        assert_eq!(
            " Distributed ".parse::<TransferLockStrategy>().unwrap(),
            TransferLockStrategy::Distributed
        );
        assert!("optimistic".parse::<TransferLockStrategy>().is_err());
    }
}
