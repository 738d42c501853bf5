//! Service-level error taxonomy.

use thiserror::Error;

use bankcore_core::DomainError;

use crate::kv::KvError;
use crate::store::StoreError;

/// How callers should treat a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; do not retry.
    Validation,
    NotFound,
    /// State conflict or contention; retrying later may succeed.
    Conflict,
    /// Infrastructure failure.
    Fatal,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource lease is held by someone else.
    #[error("resource busy: {0}")]
    Busy(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    KeyValue(#[from] KvError),

    /// Unique number generation ran out of attempts.
    #[error("could not generate a unique {0}")]
    Exhausted(String),

    /// `primary` failed and the cleanup that followed failed too.
    #[error("{primary} (lock release also failed: {release})")]
    Suppressed {
        primary: Box<LedgerError>,
        release: KvError,
    },
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Attach a cleanup failure without masking `self`.
    pub fn with_suppressed(self, release: KvError) -> Self {
        Self::Suppressed {
            primary: Box::new(self),
            release,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) | Self::Busy(_) => ErrorKind::Conflict,
            Self::Store(StoreError::VersionConflict(_) | StoreError::LockTimeout(_)) => {
                ErrorKind::Conflict
            }
            Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::Store(_) | Self::KeyValue(_) | Self::Exhausted(_) => ErrorKind::Fatal,
            Self::Suppressed { primary, .. } => primary.kind(),
        }
    }

    /// The failure callers should act on, looking through suppressed cleanup errors.
    pub fn primary(&self) -> &LedgerError {
        match self {
            Self::Suppressed { primary, .. } => primary.primary(),
            other => other,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.primary(), Self::Store(StoreError::UniqueViolation(_)))
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(m) => Self::Validation(m),
            DomainError::NotFound(m) => Self::NotFound(m),
            DomainError::Conflict(m) | DomainError::InvariantViolation(m) => Self::Conflict(m),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
