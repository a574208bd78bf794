//! HTTP Routes for the Gateway Server
//!
//! Health sits at the top level; everything else is nested under the
//! configured root URL.

pub mod auth;
pub mod health;
pub mod payment;
pub mod proof;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::Router;

use crate::error::GatewayError;
use crate::state::AppState;

/// Create all routes
pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::routes(state.clone()))
        .merge(proof::routes(state.clone()))
        .merge(payment::routes(state.clone()));

    let root = state.config().root_url.trim_end_matches('/').to_string();
    let router = Router::new().merge(health::routes());
    let router = if root.is_empty() {
        router.merge(api)
    } else {
        router.nest(&root, api)
    };

    router.with_state(state)
}

/// Malformed bodies surface as `INVALID_INPUT` inside the usual envelope.
pub(crate) fn bad_body(rejection: JsonRejection) -> GatewayError {
    GatewayError::InvalidInput(rejection.body_text())
}

pub(crate) fn bad_query(rejection: QueryRejection) -> GatewayError {
    GatewayError::InvalidInput(rejection.body_text())
}
