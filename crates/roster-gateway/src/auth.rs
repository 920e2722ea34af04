//! Shared-secret authentication for the machine-facing endpoints.
//!
//! The external scheduler (and the trusted web tier, for the send and
//! subscription routes) presents `Authorization: Bearer <cron_secret>`.
//! The check runs before any store access, so a rejected request has zero
//! side effects.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::app::AppState;

/// Returns true if the request carries the configured shared secret.
///
/// Denies everything when no secret is configured — an unset secret must not
/// mean an open endpoint.
pub fn check_cron_auth(state: &AppState, headers: &HeaderMap) -> bool {
    let expected = match state.config.gateway.cron_secret.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => return false,
    };
    extract_bearer(headers)
        .map(|token| secrets_match(token, expected))
        .unwrap_or(false)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Constant-time secret comparison: both sides are hashed first, so the
/// comparison cost does not depend on the length of the matching prefix.
fn secrets_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(extract_bearer(&headers), Some("s3cret"));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic s3cret"));
        assert_eq!(extract_bearer(&headers), None);

        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn secrets_match_exact_only() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cret", "s3cret2"));
        assert!(!secrets_match("", "s3cret"));
        assert!(!secrets_match("S3cret", "s3cret"));
    }
}
