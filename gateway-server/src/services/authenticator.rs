//! Signed request authentication
//!
//! Every protected call carries `X-SIGNATURE` over the canonical request
//! string and an `X-TIMESTAMP` that must sit inside the freshness window.
//! Two schemes share the flow and differ only in the final check:
//! RSA PKCS#1 v1.5 over SHA-256, or HMAC-SHA512 with the shared secret.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use hmac::{Hmac, Mac};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256, Sha512};
use std::path::Path;
use tracing::{debug, instrument, warn};

use super::canonical::CanonicalRequestSigner;
use crate::error::{GatewayError, Result};

type HmacSha512 = Hmac<Sha512>;

/// `YYYY-MM-DDThh:mm:ss.SSS±hh:mm`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

pub fn format_timestamp(at: DateTime<FixedOffset>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a request timestamp. Any RFC 3339 fraction width is accepted.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(timestamp).ok()
}

/// Reject timestamps older than `window` at `now`.
///
/// A non-positive window rejects everything, as does an unparseable stamp.
pub fn check_freshness(timestamp: &str, window: Duration, now: DateTime<Utc>) -> Result<()> {
    if window <= Duration::zero() {
        return Err(GatewayError::StaleRequest);
    }

    let at = parse_timestamp(timestamp).ok_or(GatewayError::StaleRequest)?;
    if now > at.with_timezone(&Utc) + window {
        return Err(GatewayError::StaleRequest);
    }
    Ok(())
}

/// Partner-supplied headers of a signed call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    pub signature: String,
    pub timestamp: String,
    pub partner_id: String,
    pub external_id: String,
    pub channel_id: String,
    pub device_id: String,
}

/// Everything the authenticator needs from one request
#[derive(Debug, Clone, Default)]
pub struct SignedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
    pub headers: RequestHeaders,
}

/// Verified caller context handed to downstream handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerContext {
    pub partner_id: String,
    pub external_id: String,
    pub channel_id: String,
    pub device_id: String,
    pub timestamp: String,
}

impl From<&RequestHeaders> for PartnerContext {
    fn from(headers: &RequestHeaders) -> Self {
        Self {
            partner_id: headers.partner_id.clone(),
            external_id: headers.external_id.clone(),
            channel_id: headers.channel_id.clone(),
            device_id: headers.device_id.clone(),
            timestamp: headers.timestamp.clone(),
        }
    }
}

pub fn load_public_key(path: &Path) -> Result<RsaPublicKey> {
    let pem = std::fs::read_to_string(path)
        .map_err(|e| GatewayError::KeyLoad(format!("cannot read {}: {e}", path.display())))?;
    RsaPublicKey::from_public_key_pem(&pem)
        .map_err(|e| GatewayError::KeyLoad(format!("{} is not an SPKI public key: {e}", path.display())))
}

/// Final signature check of each scheme
#[derive(Clone)]
pub enum SignatureScheme {
    Rsa(RsaPublicKey),
    Hmac(Vec<u8>),
}

impl SignatureScheme {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureScheme::Rsa(_) => "rsa",
            SignatureScheme::Hmac(_) => "hmac",
        }
    }

    fn verify(&self, string_to_sign: &str, signature: &[u8]) -> Result<()> {
        match self {
            SignatureScheme::Rsa(key) => {
                let digest = Sha256::digest(string_to_sign.as_bytes());
                key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
                    .map_err(|_| GatewayError::Unauthorized("rsa signature mismatch".into()))
            }
            SignatureScheme::Hmac(secret) => {
                let mut mac = HmacSha512::new_from_slice(secret)
                    .map_err(|e| GatewayError::KeyLoad(format!("invalid hmac key: {e}")))?;
                mac.update(string_to_sign.as_bytes());
                mac.verify_slice(signature)
                    .map_err(|_| GatewayError::Unauthorized("hmac signature mismatch".into()))
            }
        }
    }
}

pub struct RequestAuthenticator {
    canonical: CanonicalRequestSigner,
    window: Duration,
    scheme: SignatureScheme,
}

impl RequestAuthenticator {
    pub fn new(secret: impl Into<Vec<u8>>, window: Duration, scheme: SignatureScheme) -> Self {
        Self {
            canonical: CanonicalRequestSigner::new(secret),
            window,
            scheme,
        }
    }

    pub fn hmac(secret: &str, window: Duration) -> Self {
        Self::new(
            secret.as_bytes(),
            window,
            SignatureScheme::Hmac(secret.as_bytes().to_vec()),
        )
    }

    /// RSA scheme with the partner key loaded once from an SPKI PEM file.
    pub fn rsa(secret: &str, window: Duration, public_key_path: &Path) -> Result<Self> {
        let key = load_public_key(public_key_path)?;
        Ok(Self::new(secret.as_bytes(), window, SignatureScheme::Rsa(key)))
    }

    pub fn scheme(&self) -> &SignatureScheme {
        &self.scheme
    }

    pub fn authenticate(&self, request: &SignedRequest) -> Result<PartnerContext> {
        self.authenticate_at(request, Utc::now())
    }

    #[instrument(skip_all, fields(scheme = self.scheme.name(), path = %request.path))]
    pub fn authenticate_at(&self, request: &SignedRequest, now: DateTime<Utc>) -> Result<PartnerContext> {
        let headers = &request.headers;
        if headers.signature.is_empty() {
            debug!("Missing signature header");
            return Err(GatewayError::Unauthorized("missing signature".into()));
        }

        if let Err(e) = check_freshness(&headers.timestamp, self.window, now) {
            warn!(timestamp = %headers.timestamp, "Request outside freshness window");
            return Err(e);
        }

        let signature = STANDARD
            .decode(headers.signature.as_bytes())
            .map_err(|_| GatewayError::Unauthorized("signature is not base64".into()))?;

        let string_to_sign = self.canonical.string_to_sign(
            &request.method,
            &request.path,
            &request.body,
            &headers.timestamp,
        )?;

        self.scheme.verify(&string_to_sign, &signature)?;

        debug!(partner_id = %headers.partner_id, "Request signature verified");
        Ok(PartnerContext::from(headers))
    }
}
