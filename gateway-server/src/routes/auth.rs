//! Partner account, session and signing-helper endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{info, instrument};

use super::bad_body;
use crate::error::Result;
use crate::middleware::{require_hmac_signature, require_rsa_signature, require_session};
use crate::services::{AccessClaims, PartnerContext};
use crate::state::AppState;
use crate::types::{
    ApiResponse, CredentialsRequest, PingResponse, RefreshRequest, SessionTokens,
    SignatureResponse, SignupResponse, TokenSignRequest,
};

type Reply<T> = Result<(StatusCode, Json<ApiResponse<T>>)>;

/// Create account and session routes
pub fn routes(state: AppState) -> Router<AppState> {
    let rsa_signed = Router::new()
        .route("/rsa/login", post(login))
        .route("/refresh", post(refresh))
        .route_layer(from_fn_with_state(state.clone(), require_rsa_signature));

    let hmac_signed = Router::new()
        .route("/hmac/login", post(login))
        .route("/hmac/refresh", post(refresh))
        .route_layer(from_fn_with_state(state.clone(), require_hmac_signature));

    let rsa_session = Router::new()
        .route("/rsa/ping", get(ping))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state.clone(), require_rsa_signature));

    let hmac_session = Router::new()
        .route("/hmac/ping", get(ping))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state.clone(), require_hmac_signature));

    let mut router = Router::new()
        .route("/signup", post(signup))
        .merge(rsa_signed)
        .merge(hmac_signed)
        .merge(rsa_session)
        .merge(hmac_session);

    if state.config().signing_helpers_enabled() {
        info!("Signing helper routes enabled");
        router = router
            .route("/token", post(sign_rsa))
            .route("/token-hmac", post(sign_hmac));
    }

    router
}

/// POST /signup
#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Reply<SignupResponse> {
    let Json(request) = payload.map_err(bad_body)?;
    let partner = state
        .accounts()
        .signup(&request.username, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            StatusCode::CREATED.as_u16(),
            SignupResponse { id: partner.id },
        )),
    ))
}

/// POST /rsa/login, /hmac/login
#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Extension(partner): Extension<PartnerContext>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Reply<SessionTokens> {
    let Json(request) = payload.map_err(bad_body)?;
    let tokens = state
        .accounts()
        .login(&request.username, &request.password)
        .await?;

    info!(partner_id = %partner.partner_id, username = %request.username, "Partner logged in");
    Ok((StatusCode::OK, Json(ApiResponse::success(200, tokens))))
}

/// POST /refresh, /hmac/refresh
#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Reply<SessionTokens> {
    let Json(request) = payload.map_err(bad_body)?;
    let tokens = state
        .sessions()
        .refresh(state.store(), &request.refresh_token, &request.username)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(200, tokens))))
}

/// GET /rsa/ping, /hmac/ping
async fn ping(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Reply<PingResponse> {
    info!(partner = %claims.username, "Ping");
    let response = PingResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: state.config().app_name.clone(),
    };
    Ok((StatusCode::OK, Json(ApiResponse::success(200, response))))
}

/// POST /token
#[instrument(skip(state, payload))]
async fn sign_rsa(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TokenSignRequest>, JsonRejection>,
) -> Reply<SignatureResponse> {
    let Json(request) = payload.map_err(bad_body)?;
    let signature = state
        .signing()
        .sign_rsa(&request, &state.config().private_key_path)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            StatusCode::CREATED.as_u16(),
            SignatureResponse { signature },
        )),
    ))
}

/// POST /token-hmac
#[instrument(skip(state, payload))]
async fn sign_hmac(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TokenSignRequest>, JsonRejection>,
) -> Reply<SignatureResponse> {
    let Json(request) = payload.map_err(bad_body)?;
    let signature = state.signing().sign_hmac(&request)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            StatusCode::CREATED.as_u16(),
            SignatureResponse { signature },
        )),
    ))
}
