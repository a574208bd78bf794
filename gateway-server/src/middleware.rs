//! Request guards
//!
//! Signature guards buffer the body, authenticate the call and hand the body
//! back untouched so handlers can extract it again. The session guard checks
//! the bearer token. Both attach what they verified as request extensions.

use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::GatewayError;
use crate::services::{RequestHeaders, SignedRequest};
use crate::state::{AppState, Scheme};

/// Largest body a signed request may carry
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const PARTNER_ID_HEADER: &str = "x-partner-id";
pub const EXTERNAL_ID_HEADER: &str = "x-external-id";
pub const CHANNEL_ID_HEADER: &str = "channel-id";
pub const DEVICE_ID_HEADER: &str = "x-device-id";

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn request_headers(headers: &HeaderMap) -> RequestHeaders {
    RequestHeaders {
        signature: header_value(headers, SIGNATURE_HEADER),
        timestamp: header_value(headers, TIMESTAMP_HEADER),
        partner_id: header_value(headers, PARTNER_ID_HEADER),
        external_id: header_value(headers, EXTERNAL_ID_HEADER),
        channel_id: header_value(headers, CHANNEL_ID_HEADER),
        device_id: header_value(headers, DEVICE_ID_HEADER),
    }
}

pub async fn require_rsa_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    verify_signature(Scheme::Rsa, &state, request, next).await
}

pub async fn require_hmac_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    verify_signature(Scheme::Hmac, &state, request, next).await
}

async fn verify_signature(scheme: Scheme, state: &AppState, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return GatewayError::InvalidInput(format!("unreadable body: {e}")).into_response()
        }
    };

    // Nested routers see a stripped path; partners sign the full one.
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| original.0.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let signed = SignedRequest {
        method: parts.method.as_str().to_string(),
        path,
        body: bytes.to_vec(),
        headers: request_headers(&parts.headers),
    };

    match state.authenticator(scheme).authenticate(&signed) {
        Ok(context) => {
            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            warn!(scheme = ?scheme, path = %signed.path, error = %e, "Signed request rejected");
            GatewayError::Unauthorized(e.to_string()).into_response()
        }
    }
}

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.sessions().validate_bearer(authorization) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %request.uri().path(), error = %e, "Session rejected");
            GatewayError::Unauthorized(e.to_string()).into_response()
        }
    }
}
