//! Fixed-scale decimal helpers.
//!
//! Money is carried at scale 2 and interest rates at scale 4. Every rounding
//! in the ledger truncates toward zero; nothing ever rounds up.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

pub const MONEY_SCALE: u32 = 2;
pub const RATE_SCALE: u32 = 4;

/// Truncate to `scale` fraction digits and pad to exactly that scale.
pub fn truncate(value: Decimal, scale: u32) -> Decimal {
    let mut out = value.round_dp_with_strategy(scale, RoundingStrategy::ToZero);
    out.rescale(scale);
    out
}

/// Truncate to money scale (2).
pub fn money(value: Decimal) -> Decimal {
    truncate(value, MONEY_SCALE)
}

/// Truncate to rate scale (4).
pub fn rate(value: Decimal) -> Decimal {
    truncate(value, RATE_SCALE)
}

/// Zero at money scale (`0.00`).
pub fn zero_money() -> Decimal {
    money(Decimal::ZERO)
}

/// Zero at rate scale (`0.0000`).
pub fn zero_rate() -> Decimal {
    rate(Decimal::ZERO)
}

/// Validate that `value` fits `integer_digits` integer digits and at most
/// `fraction_digits` fraction digits (ignoring trailing zeros).
pub fn check_digits(
    field: &str,
    value: Decimal,
    integer_digits: u32,
    fraction_digits: u32,
) -> DomainResult<()> {
    let normalized = value.normalize();
    if normalized.scale() > fraction_digits {
        return Err(DomainError::validation(format!(
            "{field} must have at most {fraction_digits} fraction digits"
        )));
    }
    let limit = Decimal::from(10u64.pow(integer_digits));
    if normalized.abs().trunc() >= limit {
        return Err(DomainError::validation(format!(
            "{field} must have at most {integer_digits} integer digits"
        )));
    }
    Ok(())
}

/// Validate a strictly positive amount.
pub fn check_positive(field: &str, value: Decimal) -> DomainResult<()> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{field} must be positive")))
    }
}
