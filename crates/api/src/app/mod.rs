//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and service wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request validation and response shapes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let idempotency = services.idempotency.clone();

    // Mutating endpoints sit behind the idempotency gate.
    let api = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn_with_state(
                idempotency,
                middleware::idempotency_middleware,
            )),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
}
