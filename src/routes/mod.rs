//! Route modules for the Docmill server

pub mod cleanup;
pub mod convert;
pub mod download;
pub mod upload;
pub mod usage;

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Assemble the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/upload", post(upload::upload))
        .route("/api/v1/upload/batch", post(upload::upload_batch))
        .nest("/api/v1/convert", convert::router())
        .nest("/api/v1/download", download::router())
        .nest("/api/v1/usage", usage::router())
        .nest("/api/v1/cleanup", cleanup::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
