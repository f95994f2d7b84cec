//! Caller identity
//!
//! The identity provider is a black box that maps a bearer token to a
//! verified user id. `TokenIdentity` is the bundled implementation: a static
//! token table loaded from the environment, stored as SHA-256 digests and
//! compared in constant time.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use std::sync::Arc;

use crate::state::AppState;
use crate::types::UserId;

/// Resolves a bearer token to a verified user id
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<UserId>;
}

/// Static token table
#[derive(Debug, Clone, Default)]
pub struct TokenIdentity {
    /// (hex SHA-256 of the token, user id)
    entries: Vec<(String, UserId)>,
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

impl TokenIdentity {
    /// Build from (user id, token) pairs
    pub fn new(pairs: impl IntoIterator<Item = (UserId, String)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(user_id, token)| (digest(&token), user_id))
            .collect();
        Self { entries }
    }

    /// Parse `uid:token,uid2:token2`. Malformed entries are skipped.
    pub fn parse(spec: &str) -> Self {
        let pairs = spec.split(',').filter_map(|entry| {
            let (user_id, token) = entry.trim().split_once(':')?;
            let (user_id, token) = (user_id.trim(), token.trim());
            if user_id.is_empty() || token.is_empty() {
                tracing::warn!("Skipping malformed AUTH_TOKENS entry");
                return None;
            }
            Some((user_id.to_string(), token.to_string()))
        });
        Self::new(pairs)
    }

    /// Load from AUTH_TOKENS
    pub fn from_env() -> Self {
        let identity = std::env::var("AUTH_TOKENS")
            .map(|spec| Self::parse(&spec))
            .unwrap_or_default();

        if identity.entries.is_empty() {
            tracing::warn!("No AUTH_TOKENS configured - every request will be unauthenticated");
        } else {
            tracing::info!(users = identity.entries.len(), "Token identity loaded");
        }
        identity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityVerifier for TokenIdentity {
    fn verify(&self, token: &str) -> Option<UserId> {
        let presented = digest(token);
        // Compare against every entry so timing does not reveal the position
        let mut found = None;
        for (expected, user_id) in &self.entries {
            if constant_time_eq(expected.as_bytes(), presented.as_bytes()) && found.is_none() {
                found = Some(user_id.clone());
            }
        }
        found
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The verified caller, if any. Handlers pass this to the core, which decides
/// whether an anonymous call is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Option<UserId>);

impl Caller {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = bearer_token(parts).and_then(|token| state.identity.verify(token));
        if user_id.is_none() && parts.headers.contains_key(header::AUTHORIZATION) {
            tracing::warn!(uri = %parts.uri, "Rejected invalid credentials");
        }
        Ok(Caller(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_parse_and_verify() {
        let identity = TokenIdentity::parse("alice:tok-a, bob:tok-b,broken,:x,carol:");
        assert_eq!(identity.len(), 2);
        assert_eq!(identity.verify("tok-a").as_deref(), Some("alice"));
        assert_eq!(identity.verify("tok-b").as_deref(), Some("bob"));
        assert!(identity.verify("tok-c").is_none());
        assert!(identity.verify("").is_none());
    }

    #[test]
    fn test_tokens_are_not_stored_in_clear() {
        let identity = TokenIdentity::new([("alice".to_string(), "secret".to_string())]);
        assert!(identity.entries.iter().all(|(d, _)| d != "secret" && d.len() == 64));
    }

    #[test]
    fn test_bearer_token() {
        let (parts, _) = Request::builder()
            .header("Authorization", "Bearer abc123")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), Some("abc123"));

        let (parts, _) = Request::builder()
            .header("Authorization", "Basic YWRtaW46c2VjcmV0")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), None);

        let (parts, _) = Request::builder().body(Body::empty()).unwrap().into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
