//! Cleanup Route
//!
//! POST /api/v1/cleanup - Run the staged-file expiry sweep on demand. The
//! same sweep also runs on an interval in the background.

use axum::{extract::State, routing::post, Json, Router};

use crate::state::AppState;
use crate::storage::CleanupReport;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(run_cleanup))
}

async fn run_cleanup(State(state): State<AppState>) -> Json<CleanupReport> {
    Json(state.staging().cleanup_expired().await)
}
