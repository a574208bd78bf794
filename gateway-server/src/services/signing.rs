//! Request signing helpers
//!
//! The partner side of [`super::authenticator`]: produce `X-SIGNATURE` for a
//! call. Exposed over HTTP only in development so integrators can check their
//! own canonical strings.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256, Sha512};
use std::path::Path;
use tracing::instrument;

use super::authenticator::parse_timestamp;
use super::canonical::{compact_json, CanonicalRequestSigner};
use crate::error::{GatewayError, Result};
use crate::types::TokenSignRequest;

type HmacSha512 = Hmac<Sha512>;

pub enum RequestSigner {
    Rsa(RsaPrivateKey),
    Hmac(Vec<u8>),
}

impl RequestSigner {
    /// Accepts PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) PEM.
    pub fn rsa_from_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| GatewayError::KeyLoad(format!("not an RSA private key: {e}")))?;
        Ok(RequestSigner::Rsa(key))
    }

    pub fn rsa_from_pem_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::KeyLoad(format!("cannot read {}: {e}", path.display())))?;
        Self::rsa_from_pem(&pem)
    }

    /// Base64 signature over `string_to_sign`.
    pub fn sign(&self, string_to_sign: &str) -> Result<String> {
        let raw = match self {
            RequestSigner::Rsa(key) => {
                let digest = Sha256::digest(string_to_sign.as_bytes());
                key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
                    .map_err(|e| GatewayError::Upstream(format!("rsa signing failed: {e}")))?
            }
            RequestSigner::Hmac(secret) => {
                let mut mac = HmacSha512::new_from_slice(secret)
                    .map_err(|e| GatewayError::KeyLoad(format!("invalid hmac key: {e}")))?;
                mac.update(string_to_sign.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(STANDARD.encode(raw))
    }
}

/// Signs canonical strings described by a [`TokenSignRequest`].
pub struct SigningHelper {
    canonical: CanonicalRequestSigner,
    secret: Vec<u8>,
}

impl SigningHelper {
    pub fn new(secret: &str) -> Self {
        Self {
            canonical: CanonicalRequestSigner::new(secret.as_bytes()),
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn string_to_sign(&self, request: &TokenSignRequest) -> Result<String> {
        if request.method.is_empty() || request.endpoint.is_empty() {
            return Err(GatewayError::InvalidInput(
                "method and endpoint are required".into(),
            ));
        }
        if parse_timestamp(&request.timestamp).is_none() {
            return Err(GatewayError::InvalidInput(format!(
                "timestamp must look like 2006-01-02T15:04:05.000+07:00, got {:?}",
                request.timestamp
            )));
        }

        let compact = compact_json(request.body_compact.as_bytes())
            .map_err(|_| GatewayError::InvalidInput("bodyCompact is not valid JSON".into()))?;

        self.canonical.string_to_sign_compact(
            &request.method,
            &request.endpoint,
            &compact,
            &request.timestamp,
        )
    }

    #[instrument(skip_all, fields(endpoint = %request.endpoint))]
    pub fn sign_rsa(&self, request: &TokenSignRequest, private_key_path: &Path) -> Result<String> {
        let string_to_sign = self.string_to_sign(request)?;
        RequestSigner::rsa_from_pem_file(private_key_path)?.sign(&string_to_sign)
    }

    #[instrument(skip_all, fields(endpoint = %request.endpoint))]
    pub fn sign_hmac(&self, request: &TokenSignRequest) -> Result<String> {
        let string_to_sign = self.string_to_sign(request)?;
        RequestSigner::Hmac(self.secret.clone()).sign(&string_to_sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::authenticator::{
        RequestAuthenticator, RequestHeaders, SignatureScheme, SignedRequest,
    };
    use chrono::{DateTime, Duration, Utc};
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::LineEnding;

    const TS: &str = "2024-05-01T10:00:00.000+07:00";

    fn token_request(body: &str) -> TokenSignRequest {
        TokenSignRequest {
            method: "POST".into(),
            endpoint: "/api/v1/rsa/login".into(),
            timestamp: TS.into(),
            body_compact: body.into(),
        }
    }

    fn request_for(signature: String, body: &str) -> SignedRequest {
        SignedRequest {
            method: "POST".into(),
            path: "/api/v1/rsa/login".into(),
            body: body.as_bytes().to_vec(),
            headers: RequestHeaders {
                signature,
                timestamp: TS.into(),
                ..Default::default()
            },
        }
    }

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(TS).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_hmac_helper_output_authenticates() {
        let helper = SigningHelper::new("secret");
        let body = r#"{"username":"acme","password":"pw"}"#;
        let signature = helper.sign_hmac(&token_request(body)).unwrap();

        let auth = RequestAuthenticator::hmac("secret", Duration::hours(5));
        assert!(auth.authenticate_at(&request_for(signature, body), at()).is_ok());
    }

    #[test]
    fn test_rsa_helper_reads_pkcs1_pem() {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa256-private.pem");
        std::fs::write(&path, key.to_pkcs1_pem(LineEnding::LF).unwrap().as_bytes()).unwrap();

        let helper = SigningHelper::new("secret");
        let signature = helper.sign_rsa(&token_request("{}"), &path).unwrap();

        let auth = RequestAuthenticator::new(
            "secret",
            Duration::hours(5),
            SignatureScheme::Rsa(key.to_public_key()),
        );
        assert!(auth.authenticate_at(&request_for(signature, "{}"), at()).is_ok());
    }

    #[test]
    fn test_helper_input_validation() {
        let helper = SigningHelper::new("secret");

        let mut request = token_request("{}");
        request.timestamp = "2024-05-01 10:00".into();
        assert!(matches!(
            helper.sign_hmac(&request),
            Err(GatewayError::InvalidInput(_))
        ));

        assert!(matches!(
            helper.sign_hmac(&token_request(r#"{"username": "acme""#)),
            Err(GatewayError::InvalidInput(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            helper.sign_rsa(&token_request("{}"), &dir.path().join("absent.pem")),
            Err(GatewayError::KeyLoad(_))
        ));
    }
}
