//! Tracing and logging setup shared by every binary.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
