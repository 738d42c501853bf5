use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::routes::common::run_blocking;
use crate::app::services::AppServices;
use crate::app::dto;

/// Merged into the `/accounts` router.
pub fn router() -> Router {
    Router::new().route("/:id/interests/daily-accrual", post(accrue_daily_interest))
}

pub async fn accrue_daily_interest(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
    Json(body): Json<dto::DailyAccrualRequest>,
) -> axum::response::Response {
    let id = match dto::account_id(id) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };
    if let Err(rejection) = body.validate(services.today()) {
        return rejection;
    }

    let dto::DailyAccrualRequest {
        business_date,
        condition_codes,
    } = body;
    match run_blocking(move || {
        services
            .ledger
            .interest
            .accrue_daily_interest(id, business_date, &condition_codes)
    })
    .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(response) => response,
    }
}
