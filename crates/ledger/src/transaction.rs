//! Immutable ledger transactions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bankcore_core::{AccountId, TransactionId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
    InterestSettlement,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::InterestSettlement => "INTEREST_SETTLEMENT",
        }
    }
}

/// A transaction ready to be appended (id not yet assigned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub transaction_number: String,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    /// Account balance right after this transaction was applied.
    pub balance_after: Decimal,
    pub transaction_at: DateTime<Utc>,
}

/// A persisted transaction. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub transaction_number: String,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub transaction_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_new(id: TransactionId, new: NewTransaction) -> Self {
        Self {
            id,
            transaction_number: new.transaction_number,
            account_id: new.account_id,
            transaction_type: new.transaction_type,
            amount: new.amount,
            balance_after: new.balance_after,
            transaction_at: new.transaction_at,
        }
    }
}
