//! Stateless bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the user id and an expiry. There is no
//! server-side session store: logout is a client-side token discard, and
//! revocation is intentionally unsupported.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::ApiRequest;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Issues and verifies bearer tokens from the configured secret.
pub struct TokenManager {
    config: Arc<AppConfig>,
}

impl TokenManager {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Issue a token for a user id.
    pub fn issue(&self, user_id: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.token.expires_in).timestamp(),
            iss: self.config.token.issuer.clone(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify a token and return its claims.
    ///
    /// Any signature, structure, or expiry failure maps to
    /// [`ApiError::Unauthenticated`]; verification never leaks which check
    /// failed.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        if let Some(issuer) = &self.config.token.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthenticated)
    }

    /// Extract the bearer token from the `Authorization` header.
    pub fn extract_bearer<'a>(&self, req: &'a ApiRequest) -> Option<&'a str> {
        req.headers
            .get("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;

    fn manager() -> TokenManager {
        TokenManager::new(Arc::new(AppConfig::new(
            "a-test-secret-key-of-sufficient-length",
        )))
    }

    #[test]
    fn issue_then_verify_returns_subject() {
        let tokens = manager();
        let token = tokens.issue("user-1").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_unauthenticated() {
        let tokens = manager();
        let mut token = tokens.issue("user-1").unwrap();
        token.push('x');
        assert!(matches!(
            tokens.verify(&token),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenManager::new(Arc::new(AppConfig::new(
            "another-test-secret-key-of-sufficient-length",
        )));
        let token = other.issue("user-1").unwrap();
        assert!(manager().verify(&token).is_err());
    }

    #[test]
    fn extract_bearer_strips_scheme() {
        let tokens = manager();
        let mut req = ApiRequest::new(HttpMethod::Get, "/auth/me");
        req.headers
            .insert("authorization".to_string(), "Bearer abc.def.ghi".to_string());
        assert_eq!(tokens.extract_bearer(&req), Some("abc.def.ghi"));

        let bare = ApiRequest::new(HttpMethod::Get, "/auth/me");
        assert_eq!(tokens.extract_bearer(&bare), None);
    }
}
