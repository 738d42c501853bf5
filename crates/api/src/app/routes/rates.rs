use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
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
        .route("/base", post(register_base_rate))
        .route("/spread", post(register_spread_rate))
        .route("/preferential", post(register_preferential_rate))
        .route("/composed", get(composed_rate))
}

pub async fn register_base_rate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::BaseRateRequest>,
) -> axum::response::Response {
    if let Err(rejection) = body.validate(services.today()) {
        return rejection;
    }

    match run_blocking(move || {
        services
            .ledger
            .rates
            .register_base_rate(body.business_date, body.rate)
    })
    .await
    {
        Ok(rate) => (StatusCode::CREATED, Json(rate)).into_response(),
        Err(response) => response,
    }
}

pub async fn register_spread_rate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SpreadRateRequest>,
) -> axum::response::Response {
    let product_code = match body.validate(services.today()) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || {
        services
            .ledger
            .rates
            .register_spread_rate(&product_code, body.business_date, body.rate)
    })
    .await
    {
        Ok(rate) => (StatusCode::CREATED, Json(rate)).into_response(),
        Err(response) => response,
    }
}

pub async fn register_preferential_rate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PreferentialRateRequest>,
) -> axum::response::Response {
    let (product_code, condition_code) = match body.validate(services.today()) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || {
        services.ledger.rates.register_preferential_rate(
            &product_code,
            &condition_code,
            body.business_date,
            body.rate,
        )
    })
    .await
    {
        Ok(rate) => (StatusCode::CREATED, Json(rate)).into_response(),
        Err(response) => response,
    }
}

pub async fn composed_rate(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ComposedRateQuery>,
) -> axum::response::Response {
    let (product_code, condition_codes) = match query.validated() {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match run_blocking(move || {
        services
            .ledger
            .rates
            .composed_rate(&product_code, query.business_date, &condition_codes)
    })
    .await
    {
        Ok(rate) => (StatusCode::OK, Json(rate)).into_response(),
        Err(response) => response,
    }
}
