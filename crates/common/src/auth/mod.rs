//! Authentication utilities
//!
//! Provides:
//! - JWT validation for access tokens issued by the identity provider
//! - The `AuthContext` extractor handlers use to learn the caller
//! - Shared-secret check for the scheduled reminder trigger

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller, available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (token subject)
    pub user_id: Uuid,

    /// Email claim, when the provider includes one
    pub email: Option<String>,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    audience: Option<String>,
}

impl JwtManager {
    /// Create a new JWT manager with the given HS256 secret
    pub fn new(secret: &str, audience: Option<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            audience,
        }
    }

    /// Build from the auth section; a JWT secret is required
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.jwt_secret is required".to_string(),
            })?;

        Ok(Self::new(secret, config.jwt_audience.clone()))
    }

    /// Issue a token for a user. Used by tests and local tooling.
    pub fn generate_token(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();

        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            aud: self.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            }
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.audience {
            Some(aud) => {
                validation.set_audience(&[aud]);
                validation.set_required_spec_claims(&["exp", "aud"]);
            }
            None => validation.validate_aud = false,
        }

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Resolve the caller from request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext> {
        let token = bearer_token(headers).ok_or_else(|| AppError::Unauthorized {
            message: "Missing bearer token".to_string(),
        })?;

        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthContext {
            user_id,
            email: claims.email,
            request_id: request_id(headers),
        })
    }
}

/// Extract the token from an `Authorization: Bearer` header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Check the reminder trigger's shared secret.
///
/// With no secret configured every caller is accepted. Otherwise the request
/// must carry `Authorization: Bearer <secret>`; both sides are hashed before
/// comparison so the check does not depend on the secret's length.
pub fn verify_cron_token(configured: Option<&str>, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = configured.filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    let presented = bearer_token(headers).ok_or_else(|| AppError::Unauthorized {
        message: "Unauthorized".to_string(),
    })?;

    if digest(presented) == digest(expected) {
        Ok(())
    } else {
        Err(AppError::Unauthorized {
            message: "Unauthorized".to_string(),
        })
    }
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let jwt = Arc::<JwtManager>::from_ref(state);
        jwt.authenticate(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use axum::http::HeaderValue;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", None);
        let user_id = Uuid::new_v4();

        let token = manager
            .generate_token(user_id, Some("ada@example.com"), Duration::hours(1))
            .unwrap();
        let ctx = manager
            .authenticate(&headers_with(&format!("Bearer {}", token)))
            .unwrap();

        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test_secret", None);
        let token = manager
            .generate_token(Uuid::new_v4(), None, Duration::hours(-2))
            .unwrap();

        assert!(matches!(
            manager.validate_token(&token),
            Err(AppError::ExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret_a", None);
        let verifier = JwtManager::new("secret_b", None);
        let token = issuer
            .generate_token(Uuid::new_v4(), None, Duration::hours(1))
            .unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_audience_enforced_when_configured() {
        let issuer = JwtManager::new("secret", None);
        let verifier = JwtManager::new("secret", Some("authenticated".to_string()));
        let token = issuer
            .generate_token(Uuid::new_v4(), None, Duration::hours(1))
            .unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AppError::InvalidToken)
        ));

        let wrong = JwtManager::new("secret", Some("anon".to_string()))
            .generate_token(Uuid::new_v4(), None, Duration::hours(1))
            .unwrap();
        assert_err!(verifier.validate_token(&wrong));

        let matching = verifier
            .generate_token(Uuid::new_v4(), None, Duration::hours(1))
            .unwrap();
        let claims = assert_ok!(verifier.validate_token(&matching));
        assert_eq!(claims.aud.as_deref(), Some("authenticated"));
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let manager = JwtManager::new("secret", None);
        let err = manager.authenticate(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_cron_token() {
        assert_ok!(verify_cron_token(None, &HeaderMap::new()));
        assert_ok!(verify_cron_token(Some("s3cret"), &headers_with("Bearer s3cret")));
        assert_err!(verify_cron_token(Some("s3cret"), &headers_with("Bearer nope")));
        assert_err!(verify_cron_token(Some("s3cret"), &HeaderMap::new()));
    }
}
