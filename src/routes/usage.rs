//! Usage Route
//!
//! GET /api/v1/usage - Current metering state for the caller's identity.

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};

use crate::state::AppState;
use crate::usage::{Identity, UsageData};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(current_usage))
}

async fn current_usage(State(state): State<AppState>, headers: HeaderMap) -> Json<UsageData> {
    let identity = Identity::from_headers(&headers);
    Json(state.limiter().current_usage(&identity).await)
}
