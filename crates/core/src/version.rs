//! Optimistic concurrency primitives for mutable ledger entities.

use crate::error::{DomainError, DomainResult};

/// Implemented by entities that carry a version counter bumped on every write.
pub trait Versioned {
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (inserts of brand-new rows).
    Any,
    /// Require the stored row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn of<V: Versioned>(entity: &V) -> Self {
        Self::Exact(entity.version())
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
