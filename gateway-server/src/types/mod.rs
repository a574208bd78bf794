//! Type definitions for the Gateway Server
//!
//! Request/response bodies, the response envelope and error codes.

pub mod models;

use serde::{Deserialize, Serialize};

pub use models::{
    AdditionalInfo, CustomerRecord, PartnerIdentity, PaymentRecord, SeedData, SeedPartner,
};

/// Error codes returned by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing input
    InvalidInput,
    /// A referenced record does not exist
    NotFound,
    /// Authentication failed
    Unauthorized,
    /// Request timestamp outside the freshness window
    StaleRequest,
    /// Session token failed verification
    InvalidToken,
    /// Key material could not be loaded
    KeyLoadError,
    /// Store, cache or proving backend failure
    UpstreamFailure,
}

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// HTTP status code, repeated in the body
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(code: u16, data: T) -> Self {
        Self {
            code,
            message: "Success".to_string(),
            error: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            error: None,
            data: None,
        }
    }

    pub fn error(code: u16, error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            error: Some(error),
            data: None,
        }
    }
}

// ==================== Request Types ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// Input to the signing helpers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSignRequest {
    pub method: String,
    pub endpoint: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub body_compact: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProofQuery {
    #[serde(default)]
    pub algo: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyProofRequest {
    pub algo: String,
    pub proof: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub partner_reference_no: String,
    /// Customer account number, preferred over `customer_id`
    #[serde(default)]
    pub customer_number: String,
    #[serde(default)]
    pub customer_id: String,
    pub amount: Amount,
    #[serde(default)]
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProofRequest {
    pub partner_reference_no: String,
    pub algo: String,
    pub proof: String,
    pub amount: Amount,
    #[serde(default)]
    pub additional_info: AdditionalInfo,
}

// ==================== Response Types ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub access_expire_at: String,
    pub refresh_token: String,
    pub refresh_expire_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofIssueResponse {
    /// The proof token
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub version: String,
    pub name: String,
}

/// Server health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Circuits with all artifacts on disk
    pub circuits_ready: Vec<String>,
    pub uptime_secs: u64,
}
