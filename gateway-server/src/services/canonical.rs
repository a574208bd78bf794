//! Canonical request string
//!
//! `METHOD:PATH:hex(HMAC-SHA256(compact(body), secret)):TIMESTAMP`
//!
//! Both signature schemes sign this exact string, so partners and the gateway
//! must agree on it byte for byte.

use hmac::{Hmac, Mac};
use serde::de::IgnoredAny;
use sha2::Sha256;

use crate::error::{GatewayError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Strip insignificant whitespace from a JSON document.
///
/// The body is validated first; string contents (including escaped quotes)
/// pass through untouched. An empty body compacts to an empty body.
pub fn compact_json(body: &[u8]) -> Result<Vec<u8>> {
    if body.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_slice::<IgnoredAny>(body)
        .map_err(|e| GatewayError::Unauthorized(format!("body is not valid JSON: {e}")))?;

    let mut out = Vec::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;

    for &b in body {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            _ => out.push(b),
        }
    }

    Ok(out)
}

/// Lowercase hex HMAC-SHA256 of an already compacted body.
pub fn body_digest(compact_body: &[u8], secret: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| GatewayError::KeyLoad(format!("invalid body digest key: {e}")))?;
    mac.update(compact_body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds the string both sides sign.
#[derive(Clone)]
pub struct CanonicalRequestSigner {
    secret: Vec<u8>,
}

impl CanonicalRequestSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compact `body`, digest it and join the parts.
    pub fn string_to_sign(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: &str,
    ) -> Result<String> {
        let compact = compact_json(body)?;
        self.string_to_sign_compact(method, path, &compact, timestamp)
    }

    /// Same as [`Self::string_to_sign`] for a body the caller already compacted.
    pub fn string_to_sign_compact(
        &self,
        method: &str,
        path: &str,
        compact_body: &[u8],
        timestamp: &str,
    ) -> Result<String> {
        let digest = body_digest(compact_body, &self.secret)?;
        Ok(format!("{method}:{path}:{digest}:{timestamp}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-05-01T10:00:00.000+07:00";

    #[test]
    fn test_compaction_keeps_strings_intact() {
        let body = br#"{ "name" : "Budi  Santoso",
            "note": "say \"hi\" \\ ok",
            "list": [ 1, 2 ] }"#;
        let compact = compact_json(body).unwrap();
        assert_eq!(
            String::from_utf8(compact).unwrap(),
            r#"{"name":"Budi  Santoso","note":"say \"hi\" \\ ok","list":[1,2]}"#
        );
    }

    #[test]
    fn test_compaction_rejects_invalid_json() {
        assert!(matches!(
            compact_json(b"{\"a\": }"),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_whitespace_does_not_change_string() {
        let signer = CanonicalRequestSigner::new("secret");
        let a = signer
            .string_to_sign("POST", "/api/v1/rsa/login", br#"{"a":1}"#, TS)
            .unwrap();
        let b = signer
            .string_to_sign("POST", "/api/v1/rsa/login", b"{ \"a\" :\n 1 }", TS)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_of_string() {
        let signer = CanonicalRequestSigner::new("secret");
        let s = signer.string_to_sign("GET", "/api/v1/rsa/ping", b"", TS).unwrap();

        let parts: Vec<&str> = s.splitn(4, ':').collect();
        assert_eq!(parts[0], "GET");
        assert_eq!(parts[1], "/api/v1/rsa/ping");
        assert_eq!(parts[2].len(), 64);
        assert_eq!(parts[2], parts[2].to_lowercase());
        assert_eq!(parts[3], TS);
        // Empty body still yields a keyed digest
        assert_eq!(parts[2], body_digest(b"", b"secret").unwrap());
    }

    #[test]
    fn test_any_component_changes_string() {
        let signer = CanonicalRequestSigner::new("secret");
        let base = signer.string_to_sign("POST", "/p", b"{}", TS).unwrap();

        assert_ne!(base, signer.string_to_sign("PUT", "/p", b"{}", TS).unwrap());
        assert_ne!(base, signer.string_to_sign("POST", "/q", b"{}", TS).unwrap());
        assert_ne!(base, signer.string_to_sign("POST", "/p", b"[]", TS).unwrap());
        assert_ne!(
            base,
            CanonicalRequestSigner::new("other")
                .string_to_sign("POST", "/p", b"{}", TS)
                .unwrap()
        );
    }
}
