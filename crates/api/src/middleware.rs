use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use bankcore_infra::idempotency::{CachedResponse, IdempotencyStore};
use bankcore_infra::kv::KvError;

use crate::app::errors::json_error;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Replays the stored body for a repeated `Idempotency-Key` instead of running
/// the handler again.
///
/// GET requests and requests without the header pass straight through. The
/// key is scoped by method and path, so one client key may be reused across
/// endpoints.
pub async fn idempotency_middleware(
    State(store): State<IdempotencyStore>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::GET {
        return next.run(req).await;
    }
    let Some(client_key) = extract_key(req.headers()) else {
        return next.run(req).await;
    };

    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let key = IdempotencyStore::scoped_key(req.method().as_str(), &path, &client_key);

    let acquired = {
        let (store, key) = (store.clone(), key.clone());
        blocking(move || store.try_acquire(&key)).await
    };
    match acquired {
        Ok(true) => {}
        Ok(false) => return replay(store, key).await,
        Err(e) => return unavailable(e),
    }

    let response = next.run(req).await;

    if !response.status().is_success() {
        forget(store, key).await;
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            forget(store, key).await;
            error!(error = %e, "failed to buffer response body");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "failed to read response body",
            );
        }
    };

    let text = String::from_utf8_lossy(&bytes).into_owned();
    let saved = {
        let store = store.clone();
        let key = key.clone();
        blocking(move || store.save_response(&key, &text)).await
    };
    if let Err(e) = saved {
        // The side effect is committed; the marker expires with the TTL.
        error!(key = %key, error = %e, "failed to cache idempotent response");
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn extract_key(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(IDEMPOTENCY_KEY_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

async fn replay(store: IdempotencyStore, key: String) -> Response {
    let cached = {
        let key = key.clone();
        blocking(move || store.get_response(&key)).await
    };
    match cached {
        Ok(CachedResponse::Completed(body)) => {
            debug!(key = %key, "replaying cached response");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response()
        }
        Ok(CachedResponse::InProgress) => json_error(
            StatusCode::CONFLICT,
            "request_in_progress",
            "a request with this idempotency key is still being processed",
        ),
        Ok(CachedResponse::Absent) => json_error(
            StatusCode::CONFLICT,
            "request_in_progress",
            "idempotency key is contended; retry the request",
        ),
        Err(e) => unavailable(e),
    }
}

/// Drop the marker so the client can retry a request that did not succeed.
async fn forget(store: IdempotencyStore, key: String) {
    let cleared = {
        let key = key.clone();
        blocking(move || store.clear(&key)).await
    };
    if let Err(e) = cleared {
        warn!(key = %key, error = %e, "failed to clear idempotency marker");
    }
}

fn unavailable(e: KvError) -> Response {
    error!(error = %e, "idempotency store unavailable");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "idempotency_unavailable",
        e.to_string(),
    )
}

/// Key-value calls may hit the network, so they run on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T, KvError>
where
    F: FnOnce() -> Result<T, KvError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| KvError::Unavailable(format!("idempotency task failed: {e}")))?
}
