use axum::http::StatusCode;

use bankcore_infra::services::LedgerResult;

use crate::app::errors;

/// Run a synchronous ledger operation on the blocking pool.
///
/// Service calls may wait on row locks, so they never run on the async workers.
pub async fn run_blocking<T, F>(op: F) -> Result<T, axum::response::Response>
where
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(errors::ledger_error_to_response(e)),
        Err(e) => Err(errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            format!("ledger task failed: {e}"),
        )),
    }
}
