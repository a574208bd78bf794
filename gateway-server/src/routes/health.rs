//! Health endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use identity_proof::AlgorithmId;

use crate::state::AppState;
use crate::types::HealthResponse;

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check endpoint
/// GET /health
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let circuits = state.proofs().circuits();
    let circuits_ready = AlgorithmId::ALL
        .iter()
        .filter(|id| circuits.is_initialized(**id))
        .map(|id| id.as_str().to_string())
        .collect();

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        circuits_ready,
        uptime_secs: state.uptime_secs(),
    };

    (StatusCode::OK, Json(response))
}
