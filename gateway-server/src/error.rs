//! Gateway error taxonomy and its HTTP rendering

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use identity_proof::CircuitError;
use thiserror::Error;
use tracing::{debug, error};

use crate::types::{ApiResponse, ErrorCode};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("request timestamp outside freshness window")]
    StaleRequest,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("key load error: {0}")]
    KeyLoad(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::InvalidInput(_) => ErrorCode::InvalidInput,
            GatewayError::NotFound(_) => ErrorCode::NotFound,
            GatewayError::Unauthorized(_) => ErrorCode::Unauthorized,
            GatewayError::StaleRequest => ErrorCode::StaleRequest,
            GatewayError::InvalidToken(_) => ErrorCode::InvalidToken,
            GatewayError::KeyLoad(_) => ErrorCode::KeyLoadError,
            GatewayError::Upstream(_) => ErrorCode::UpstreamFailure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) | GatewayError::NotFound(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized(_)
            | GatewayError::StaleRequest
            | GatewayError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            GatewayError::KeyLoad(_) | GatewayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Authentication failures all look the same from outside.
    fn public_message(&self) -> String {
        match self {
            GatewayError::Unauthorized(_) | GatewayError::StaleRequest => {
                "unauthorized".to_string()
            }
            GatewayError::InvalidToken(_) => "invalid token".to_string(),
            GatewayError::KeyLoad(_) | GatewayError::Upstream(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<CircuitError> for GatewayError {
    fn from(e: CircuitError) -> Self {
        match e {
            CircuitError::UnknownAlgorithm(algo) => {
                GatewayError::InvalidInput(format!("unknown algorithm: {algo}"))
            }
            CircuitError::InvalidAssignment(reason) => GatewayError::InvalidInput(reason),
            CircuitError::Artifact(reason) => GatewayError::KeyLoad(reason),
            other => GatewayError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, "Request rejected");
        }

        let body = ApiResponse::<()>::error(status.as_u16(), self.code(), self.public_message());
        (status, Json(body)).into_response()
    }
}
