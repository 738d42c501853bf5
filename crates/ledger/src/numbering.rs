//! Account and transaction number generation.
//!
//! Candidates are random; uniqueness is decided by an oracle (usually a store
//! lookup). Generation gives up after a bounded number of attempts.

use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;

pub const MAX_NUMBER_ATTEMPTS: usize = 10;

/// `110-NNN-NNNNNN` with segments in 100..=999 and 100000..=999999.
pub fn account_number_candidate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let middle: u32 = rng.gen_range(100..=999);
    let last: u32 = rng.gen_range(100_000..=999_999);
    format!("110-{middle:03}-{last:06}")
}

/// `TXN-yyyyMMddHHmmss-NNNN` using local time at `offset`.
pub fn transaction_number_candidate<R: Rng + ?Sized>(
    rng: &mut R,
    at: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let stamp = at.with_timezone(&offset).format("%Y%m%d%H%M%S");
    let suffix: u32 = rng.gen_range(1000..=9999);
    format!("TXN-{stamp}-{suffix}")
}

/// Draw candidates until `is_taken` reports a free one.
///
/// Returns `Ok(None)` when every attempt collided; oracle errors propagate.
pub fn generate_unique<E>(
    mut candidate: impl FnMut() -> String,
    mut is_taken: impl FnMut(&str) -> Result<bool, E>,
    max_attempts: usize,
) -> Result<Option<String>, E> {
    for _ in 0..max_attempts {
        let next = candidate();
        if !is_taken(&next)? {
            return Ok(Some(next));
        }
    }
    Ok(None)
}
