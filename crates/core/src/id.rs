//! Strongly-typed identifiers used across the ledger.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a deposit account (store-assigned, positive).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

/// Identifier of a customer owning accounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

/// Identifier of a ledger transaction row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

macro_rules! impl_numeric_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Validating constructor for caller-supplied ids.
            pub fn positive(value: i64) -> Result<Self, DomainError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(DomainError::validation(format!(
                        "{} must be positive (got {})",
                        $name, value
                    )))
                }
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .parse::<i64>()
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))?;
                Self::positive(raw)
            }
        }
    };
}

impl_numeric_newtype!(AccountId, "AccountId");
impl_numeric_newtype!(CustomerId, "CustomerId");
impl_numeric_newtype!(TransactionId, "TransactionId");
