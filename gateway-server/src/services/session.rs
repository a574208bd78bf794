//! Session tokens
//!
//! HS256 JWTs in the usual `base64url(header).base64url(claims).base64url(mac)`
//! form. Access and refresh tokens are signed with the same configured secret
//! and told apart by their `use` claim. Only HS256 headers are accepted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, instrument};

use crate::error::{GatewayError, Result};
use crate::store::Store;
use crate::types::{PartnerIdentity, SessionTokens};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub id: String,
    pub username: String,
    pub login_at: String,
    pub expire_at: String,
    /// Unix seconds
    pub exp: i64,
    #[serde(rename = "use")]
    pub token_use: TokenUse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub id: String,
    pub expire_at: String,
    pub exp: i64,
    #[serde(rename = "use")]
    pub token_use: TokenUse,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct SessionTokenIssuer {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionTokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(&self, partner: &PartnerIdentity) -> Result<SessionTokens> {
        self.issue_at(partner, Utc::now())
    }

    #[instrument(skip_all, fields(partner_id = %partner.id))]
    pub fn issue_at(&self, partner: &PartnerIdentity, now: DateTime<Utc>) -> Result<SessionTokens> {
        let access_expire = now + self.access_ttl;
        let refresh_expire = now + self.refresh_ttl;

        let access = AccessClaims {
            id: partner.id.clone(),
            username: partner.username.clone(),
            login_at: rfc3339(now),
            expire_at: rfc3339(access_expire),
            exp: access_expire.timestamp(),
            token_use: TokenUse::Access,
        };
        let refresh = RefreshClaims {
            id: partner.id.clone(),
            expire_at: rfc3339(refresh_expire),
            exp: refresh_expire.timestamp(),
            token_use: TokenUse::Refresh,
        };

        let tokens = SessionTokens {
            access_token: self.encode(&access)?,
            access_expire_at: access.expire_at,
            refresh_token: self.encode(&refresh)?,
            refresh_expire_at: refresh.expire_at,
        };

        info!(access_expire_at = %tokens.access_expire_at, "Session issued");
        Ok(tokens)
    }

    pub async fn refresh(
        &self,
        store: &dyn Store,
        refresh_token: &str,
        expected_username: &str,
    ) -> Result<SessionTokens> {
        self.refresh_at(store, refresh_token, expected_username, Utc::now())
            .await
    }

    /// Exchange a refresh token for a new pair, re-reading the partner record.
    #[instrument(skip(self, store, refresh_token))]
    pub async fn refresh_at(
        &self,
        store: &dyn Store,
        refresh_token: &str,
        expected_username: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionTokens> {
        if expected_username.is_empty() {
            return Err(GatewayError::InvalidInput("username is required".into()));
        }

        let claims: RefreshClaims = self.decode(refresh_token)?;
        if claims.token_use != TokenUse::Refresh {
            return Err(GatewayError::InvalidToken("not a refresh token".into()));
        }
        if claims.exp <= now.timestamp() {
            return Err(GatewayError::InvalidToken("refresh token expired".into()));
        }

        let partner = store
            .partner_by_id(&claims.id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("partner {}", claims.id)))?;

        if partner.username != expected_username {
            return Err(GatewayError::InvalidToken(
                "refresh token issued to another partner".into(),
            ));
        }

        self.issue_at(&partner, now)
    }

    pub fn validate_access(&self, token: &str) -> Result<AccessClaims> {
        self.validate_access_at(token, Utc::now())
    }

    pub fn validate_access_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims> {
        let claims: AccessClaims = self.decode(token)?;
        if claims.token_use != TokenUse::Access {
            return Err(GatewayError::InvalidToken("not an access token".into()));
        }
        if claims.exp <= now.timestamp() {
            return Err(GatewayError::InvalidToken("access token expired".into()));
        }
        Ok(claims)
    }

    /// Validate an `Authorization: Bearer <token>` header value.
    pub fn validate_bearer(&self, authorization: Option<&str>) -> Result<AccessClaims> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| GatewayError::Unauthorized("missing bearer token".into()))?;

        self.validate_access(token)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| GatewayError::KeyLoad(format!("invalid session key: {e}")))
    }

    fn encode<T: Serialize>(&self, claims: &T) -> Result<String> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let header = serde_json::to_vec(&header)
            .map_err(|e| GatewayError::Upstream(format!("JWT header encoding failed: {e}")))?;
        let payload = serde_json::to_vec(claims)
            .map_err(|e| GatewayError::Upstream(format!("JWT payload encoding failed: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        let invalid = |reason: &str| GatewayError::InvalidToken(reason.to_string());

        let mut parts = token.split('.');
        let (header_b64, payload_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(invalid("malformed token")),
            };

        let header: Header = URL_SAFE_NO_PAD
            .decode(header_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| invalid("malformed header"))?;
        if header.alg != ALGORITHM {
            debug!(alg = %header.alg, "Rejected token algorithm");
            return Err(invalid("unexpected signing algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| invalid("malformed signature"))?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        URL_SAFE_NO_PAD
            .decode(payload_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| invalid("malformed claims"))
    }
}
