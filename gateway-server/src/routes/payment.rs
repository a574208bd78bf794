//! Payment endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::post,
    Extension, Json, Router,
};
use identity_proof::AlgorithmId;
use tracing::{instrument, warn};

use super::bad_body;
use crate::error::{GatewayError, Result};
use crate::middleware::{require_rsa_signature, require_session};
use crate::services::{AccessClaims, CustomerRef, IdentitySource, PartnerContext, PaymentOrder};
use crate::state::AppState;
use crate::types::{
    AdditionalInfo, ApiResponse, PaymentProofRequest, PaymentRequest, PaymentResponse,
};

type Reply = Result<(StatusCode, Json<ApiResponse<PaymentResponse>>)>;

/// Create payment routes
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/transaction/payment", post(payment))
        .route("/transaction/payment-proof", post(payment_with_proof))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state, require_rsa_signature))
}

/// Fill device and channel from the signed headers when the body leaves them out.
fn additional_info(mut info: AdditionalInfo, partner: &PartnerContext) -> AdditionalInfo {
    if info.device_id.is_empty() {
        info.device_id = partner.device_id.clone();
    }
    if info.channel.is_empty() {
        info.channel = partner.channel_id.clone();
    }
    info
}

/// POST /transaction/payment
#[instrument(skip(state, partner, claims, payload))]
async fn payment(
    State(state): State<AppState>,
    Extension(partner): Extension<PartnerContext>,
    Extension(claims): Extension<AccessClaims>,
    payload: std::result::Result<Json<PaymentRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = payload.map_err(bad_body)?;

    let source = IdentitySource::Session {
        partner_id: claims.id,
        customer: CustomerRef::from_fields(&request.customer_number, &request.customer_id),
    };
    let order = PaymentOrder {
        partner_reference_no: request.partner_reference_no,
        amount: request.amount,
        additional_info: additional_info(request.additional_info, &partner),
    };

    let id = state.payments().authorize(source, order).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(200, PaymentResponse { id })),
    ))
}

/// POST /transaction/payment-proof
#[instrument(skip(state, partner, claims, payload))]
async fn payment_with_proof(
    State(state): State<AppState>,
    Extension(partner): Extension<PartnerContext>,
    Extension(claims): Extension<AccessClaims>,
    payload: std::result::Result<Json<PaymentProofRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = payload.map_err(bad_body)?;
    let algorithm: AlgorithmId = request.algo.parse()?;

    let redemption = state.proofs().redeem(&request.proof, algorithm).await;
    if !redemption.valid {
        warn!(partner = %claims.username, algorithm = %algorithm, "Payment proof not valid");
        return Err(GatewayError::Unauthorized("proof not valid".into()));
    }

    let order = PaymentOrder {
        partner_reference_no: request.partner_reference_no,
        amount: request.amount,
        additional_info: additional_info(request.additional_info, &partner),
    };

    let id = state
        .payments()
        .authorize(IdentitySource::Proof(redemption), order)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(200, PaymentResponse { id })),
    ))
}
