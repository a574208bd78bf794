//! Proof token issuance and verification endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use identity_proof::AlgorithmId;
use tracing::{info, instrument, warn};

use super::{bad_body, bad_query};
use crate::error::{GatewayError, Result};
use crate::middleware::{require_hmac_signature, require_rsa_signature, require_session};
use crate::services::AccessClaims;
use crate::state::AppState;
use crate::types::{ApiResponse, ProofIssueResponse, ProofQuery, VerifyProofRequest};

/// Create proof routes
pub fn routes(state: AppState) -> Router<AppState> {
    let rsa_session = Router::new()
        .route("/rsa/proof", post(verify_proof))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state.clone(), require_rsa_signature));

    let hmac_session = Router::new()
        .route("/hmac/proof", post(verify_proof))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state, require_hmac_signature));

    Router::new()
        .route("/proof", get(issue_proof))
        .merge(rsa_session)
        .merge(hmac_session)
}

/// Issue a proof token for a customer
/// GET /proof?algo=elliptic&id=C1
#[instrument(skip(state, query))]
async fn issue_proof(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProofQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProofIssueResponse>>)> {
    let Query(query) = query.map_err(bad_query)?;
    let algorithm: AlgorithmId = query.algo.parse()?;
    let hash = state.proofs().issue(&query.id, algorithm).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(200, ProofIssueResponse { hash })),
    ))
}

/// Redeem a proof token
/// POST /rsa/proof, /hmac/proof
#[instrument(skip(state, claims, payload))]
async fn verify_proof(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    payload: std::result::Result<Json<VerifyProofRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>)> {
    let Json(request) = payload.map_err(bad_body)?;
    let algorithm: AlgorithmId = request.algo.parse()?;

    let redemption = state.proofs().redeem(&request.proof, algorithm).await;
    if !redemption.valid {
        warn!(partner = %claims.username, algorithm = %algorithm, "Proof not valid");
        return Err(GatewayError::Unauthorized("proof not valid".into()));
    }

    info!(
        partner = %claims.username,
        customer_id = %redemption.customer_id,
        algorithm = %algorithm,
        "Proof verified"
    );
    Ok((StatusCode::OK, Json(ApiResponse::<()>::message(200, "Success"))))
}
