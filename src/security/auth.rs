//! Authentication
//!
//! Access tokens are HS256 JWTs carrying Supabase-style claims. The same
//! secret signs short-lived service-role tokens used when the service
//! re-invokes its own functions.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::config::SecurityConfig;
use crate::error::{AppError, Result};

/// Role granted to tokens minted by the service for itself
pub const SERVICE_ROLE: &str = "service_role";

/// Role of regular signed-in users
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// `authenticated` or `service_role`
    pub role: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn new(sub: &str, email: Option<&str>, role: &str, audience: &str, ttl_seconds: u64) -> Self {
        let now = Utc::now().timestamp() as usize;
        Self {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            role: role.to_string(),
            aud: audience.to_string(),
            exp: now + ttl_seconds as usize,
            iat: now,
        }
    }

    pub fn is_service(&self) -> bool {
        self.role == SERVICE_ROLE
    }
}

/// Issues and verifies access tokens
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    audience: String,
    service_token_ttl: u64,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("audience", &self.audience)
            .field("service_token_ttl", &self.service_token_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtAuth {
    pub fn new(secret: &str, audience: &str, service_token_ttl: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.leeway = 30;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            audience: audience.to_string(),
            service_token_ttl,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_audience, config.service_token_ttl)
    }

    /// Verify signature, audience and expiry
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("invalid token: {}", e)))
    }

    /// Sign arbitrary claims
    pub fn issue(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Token for a regular user
    pub fn issue_user_token(&self, user_id: &str, email: Option<&str>, ttl_seconds: u64) -> Result<String> {
        self.issue(&Claims::new(user_id, email, AUTHENTICATED_ROLE, &self.audience, ttl_seconds))
    }

    /// Short-lived service-role token acting on behalf of `user_id`
    pub fn issue_service_token(&self, user_id: &str) -> Result<String> {
        self.issue(&Claims::new(user_id, None, SERVICE_ROLE, &self.audience, self.service_token_ttl))
    }
}

/// Pull the bearer token out of an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new("test-secret-with-at-least-32-characters!", "authenticated", 60)
    }

    #[test]
    fn test_issue_and_validate_user_token() {
        let auth = auth();
        let token = auth.issue_user_token("user-1", Some("ana@farma.com.br"), 3600).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("ana@farma.com.br"));
        assert!(!claims.is_service());
    }

    #[test]
    fn test_service_token_role() {
        let auth = auth();
        let token = auth.issue_service_token("user-1").unwrap();
        assert!(auth.validate_token(&token).unwrap().is_service());
    }

    #[test]
    fn test_rejects_wrong_secret_and_audience() {
        let token = auth().issue_user_token("user-1", None, 3600).unwrap();

        let other_secret = JwtAuth::new("another-secret-with-at-least-32-chars!!", "authenticated", 60);
        assert!(other_secret.validate_token(&token).is_err());

        let other_audience = JwtAuth::new("test-secret-with-at-least-32-characters!", "anon", 60);
        assert!(other_audience.validate_token(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let auth = auth();
        let mut claims = Claims::new("user-1", None, AUTHENTICATED_ROLE, "authenticated", 0);
        claims.exp = claims.iat - 3600;
        let token = auth.issue(&claims).unwrap();
        assert!(matches!(auth.validate_token(&token), Err(AppError::Authentication(_))));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }
}
