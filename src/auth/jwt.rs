//! JWT token generation and validation
//!
//! Tokens are issued by the platform's identity service; this service only
//! needs to verify them and recover the subject's user id. The validator is
//! built from injected configuration, never from a process-wide secret.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::schemas::UserRole;
use crate::types::{ArtelError, Result};

/// Fixed secret for dev mode. Never used in production.
const DEV_SECRET: &str = "artel-dev-secret-do-not-use-in-production";

/// JWT claims carried by a bearer token
///
/// The role claim is advisory only: handlers load the identity record and
/// use its stored role, so a stale token cannot keep elevated rights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (ObjectId hex)
    pub sub: String,
    /// Display name at issuance time
    pub name: String,
    /// Role at issuance time
    pub role: UserRole,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Validates and mints bearer tokens
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator from the configured secret
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Dev-mode validator with a fixed insecure secret
    pub fn new_dev() -> Self {
        Self::new(DEV_SECRET, 86400)
    }

    /// Verify a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ArtelError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Mint a token for a user (used by tests and the identity contract)
    pub fn generate_token(&self, user_id: &str, name: &str, role: UserRole) -> Result<String> {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ArtelError::Internal(format!("Token generation failed: {}", e)))
    }
}

/// Extract the bearer token from an `Authorization` header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let jwt = JwtValidator::new_dev();
        let token = jwt
            .generate_token("64f000000000000000000001", "Мария", UserRole::Pro)
            .unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "64f000000000000000000001");
        assert_eq!(claims.role, UserRole::Pro);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtValidator::new("secret-a", 3600);
        let verifier = JwtValidator::new("secret-b", 3600);
        let token = issuer
            .generate_token("64f000000000000000000001", "x", UserRole::Participant)
            .unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(ArtelError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = JwtValidator::new_dev();
        assert!(jwt.validate_token("not-a-token").is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic dXNlcg==")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
