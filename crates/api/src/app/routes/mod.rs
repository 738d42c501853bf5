use axum::Router;

pub mod accounts;
pub mod common;
pub mod interest;
pub mod rates;
pub mod system;
pub mod transfers;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/accounts", accounts::router().merge(interest::router()))
        .nest("/transfers", transfers::router())
        .nest("/rates", rates::router())
}
