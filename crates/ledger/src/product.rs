//! Deposit products (reference data).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bankcore_core::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Business key, e.g. `SAV001`.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub interest_rate: Option<Decimal>,
    /// Maximum ACTIVE accounts one customer may hold; `0` means unlimited.
    pub max_accounts_per_customer: u32,
}

impl Product {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            interest_rate: None,
            max_accounts_per_customer: 0,
        }
    }

    pub fn with_max_accounts_per_customer(mut self, max: u32) -> Self {
        self.max_accounts_per_customer = max;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("product code cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(())
    }

    /// Whether a customer already holding `active_count` accounts may open another.
    pub fn ensure_capacity(&self, active_count: u64) -> DomainResult<()> {
        if self.max_accounts_per_customer == 0 {
            return Ok(());
        }
        if active_count >= u64::from(self.max_accounts_per_customer) {
            return Err(DomainError::conflict(format!(
                "customer already holds the maximum of {} active {} accounts",
                self.max_accounts_per_customer, self.code
            )));
        }
        Ok(())
    }
}
