use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::routes::common::run_blocking;
use crate::app::services::AppServices;
use crate::app::dto;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_account))
        .route("/:id", get(get_account))
        .route("/:id/transactions", get(list_transactions))
        .route("/:id/deposit", post(deposit))
        .route("/:id/withdraw", post(withdraw))
        .route("/:id/close", post(close_account))
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    let command = match body.into_command() {
        Ok(c) => c,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.accounts.create_account(command)).await {
        Ok(details) => (StatusCode::CREATED, Json(dto::AccountResponse::from(details))).into_response(),
        Err(response) => response,
    }
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = match dto::account_id(id) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.accounts.get_account(id)).await {
        Ok(details) => (StatusCode::OK, Json(dto::AccountResponse::from(details))).into_response(),
        Err(response) => response,
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = match dto::account_id(id) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.accounts.list_transactions(id)).await {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(response) => response,
    }
}

pub async fn deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
    Json(body): Json<dto::AmountRequest>,
) -> axum::response::Response {
    let (id, amount) = match dto::account_id(id).and_then(|id| Ok((id, body.validated()?))) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.accounts.deposit(id, amount)).await {
        Ok(details) => (StatusCode::OK, Json(dto::AccountResponse::from(details))).into_response(),
        Err(response) => response,
    }
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
    Json(body): Json<dto::AmountRequest>,
) -> axum::response::Response {
    let (id, amount) = match dto::account_id(id).and_then(|id| Ok((id, body.validated()?))) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.accounts.withdraw(id, amount)).await {
        Ok(details) => (StatusCode::OK, Json(dto::AccountResponse::from(details))).into_response(),
        Err(response) => response,
    }
}

/// Close a zero-balance account, settling early-termination interest first.
pub async fn close_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = match dto::account_id(id) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || services.ledger.accounts.close(id)).await {
        Ok(details) => (StatusCode::OK, Json(dto::AccountResponse::from(details))).into_response(),
        Err(response) => response,
    }
}
