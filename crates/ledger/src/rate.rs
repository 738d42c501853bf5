//! Interest rate tables: base, spread and preferential rates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bankcore_core::money::{check_digits, check_positive};
use bankcore_core::{DomainError, DomainResult};

pub const MAX_CONDITION_CODES: usize = 20;
pub const MAX_CONDITION_CODE_LEN: usize = 50;

/// Market base rate for a business date. At most one per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRate {
    pub business_date: NaiveDate,
    pub rate: Decimal,
}

/// Product-specific spread over the base rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadRate {
    pub product_code: String,
    pub business_date: NaiveDate,
    pub rate: Decimal,
    pub active: bool,
}

/// Bonus rate granted when the customer meets `condition_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferentialRate {
    pub product_code: String,
    pub condition_code: String,
    pub business_date: NaiveDate,
    pub rate: Decimal,
    pub active: bool,
}

/// Trim, drop blanks and de-duplicate condition codes, keeping first-seen order.
pub fn normalize_condition_codes<S: AsRef<str>>(codes: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let trimmed = code.as_ref().trim();
        if trimmed.is_empty() || out.iter().any(|c| c == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// Caller-facing rules for condition codes on accrual requests.
///
/// At most 20 codes; each non-blank, `[A-Z_]{1,50}` after trimming, and
/// unique after trimming.
pub fn validate_condition_codes<S: AsRef<str>>(codes: &[S]) -> DomainResult<()> {
    if codes.len() > MAX_CONDITION_CODES {
        return Err(DomainError::validation(format!(
            "at most {MAX_CONDITION_CODES} condition codes are allowed"
        )));
    }
    let mut seen: Vec<&str> = Vec::with_capacity(codes.len());
    for code in codes {
        let trimmed = code.as_ref().trim();
        validate_condition_code(trimmed)?;
        if seen.contains(&trimmed) {
            return Err(DomainError::validation(format!(
                "duplicate condition code: {trimmed}"
            )));
        }
        seen.push(trimmed);
    }
    Ok(())
}

/// A single condition code: non-blank and `[A-Z_]{1,50}`.
pub fn validate_condition_code(code: &str) -> DomainResult<()> {
    if code.is_empty() {
        return Err(DomainError::validation("condition code cannot be blank"));
    }
    let well_formed = code.len() <= MAX_CONDITION_CODE_LEN
        && code.bytes().all(|b| b.is_ascii_uppercase() || b == b'_');
    if !well_formed {
        return Err(DomainError::validation(format!(
            "condition code must match [A-Z_]{{1,{MAX_CONDITION_CODE_LEN}}}: {code}"
        )));
    }
    Ok(())
}

/// Registered rates: strictly positive, one integer digit, up to four fraction digits.
pub fn validate_rate_value(rate: Decimal) -> DomainResult<()> {
    check_positive("rate", rate)?;
    check_digits("rate", rate, 1, 4)
}
