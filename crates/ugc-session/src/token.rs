//! Bearer token helpers
//!
//! Claims are decoded without signature verification; they are only used
//! for display and diagnostics, never to make trust decisions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    /// `access` or `refresh`
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp?, 0)
    }
}

/// Decode the payload segment of a JWT. Returns `None` for anything that
/// isn't a three-part token with a JSON payload.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token)?.expires_at()
}

/// Undecodable tokens count as expired; tokens without `exp` never expire.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Some(claims) => claims.exp.is_some_and(|exp| exp < now.timestamp()),
        None => true,
    }
}

/// Short stable identifier for log lines
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest
        .iter()
        .take(6)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_decode_claims() {
        let token = jwt(r#"{"sub":"a@b.com","exp":1700000000,"type":"access"}"#);
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("a@b.com"));
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_claims("AT1").is_none());
        assert!(decode_claims("a.b").is_none());
        assert!(decode_claims("a.!!!.c").is_none());
        assert!(decode_claims(&format!("{}.extra", jwt("{}"))).is_none());
    }

    #[test]
    fn test_is_token_expired() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(is_token_expired(&jwt(r#"{"exp":1699999999}"#), now));
        assert!(!is_token_expired(&jwt(r#"{"exp":1700000001}"#), now));
        assert!(!is_token_expired(&jwt(r#"{"sub":"a@b.com"}"#), now));
        assert!(is_token_expired("not-a-jwt", now));
    }

    #[test]
    fn test_fingerprint() {
        let fp = fingerprint("AT1");
        assert_eq!(fp.len(), 12);
        assert_eq!(fp, fingerprint("AT1"));
        assert_ne!(fp, fingerprint("AT2"));
    }
}
