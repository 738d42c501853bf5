use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::routes::common::run_blocking;
use crate::app::services::AppServices;
use crate::app::dto;

pub fn router() -> Router {
    Router::new().route("/", post(transfer))
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let (from, to, amount) = match body.validated() {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.transfers.transfer(from, to, amount)).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(response) => response,
    }
}
