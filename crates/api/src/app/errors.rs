use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use bankcore_infra::services::{ErrorKind, LedgerError};

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let message = err.to_string();
    match err.kind() {
        ErrorKind::Validation => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        ErrorKind::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        ErrorKind::Conflict => {
            let code = match err.primary() {
                LedgerError::Busy(_) => "resource_busy",
                _ => "conflict",
            };
            json_error(StatusCode::CONFLICT, code, message)
        }
        ErrorKind::Fatal => {
            error!(error = %err, "request failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankcore_infra::kv::KvError;
    use bankcore_infra::store::StoreError;

    #[test]
    fn maps_error_kinds_to_status_codes() {
        let cases = [
            (LedgerError::validation("bad"), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("gone"), StatusCode::NOT_FOUND),
            (LedgerError::conflict("closed"), StatusCode::CONFLICT),
            (LedgerError::Busy("lock:account:1".into()), StatusCode::CONFLICT),
            (
                LedgerError::Store(StoreError::VersionConflict("account 1".into())),
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::KeyValue(KvError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ledger_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn suppressed_release_failure_keeps_primary_status() {
        let err = LedgerError::conflict("insufficient funds")
            .with_suppressed(KvError::Command("del failed".into()));
        assert_eq!(ledger_error_to_response(err).status(), StatusCode::CONFLICT);
    }
}
