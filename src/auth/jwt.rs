//! Bearer token handling
//!
//! Tokens are HS256-signed and carry `{user_id, role, email, iat, exp}`.
//! The signing key is handed to [`JwtValidator`] once at startup and never
//! read from ambient state afterwards.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::types::{AuthError, MicError};

/// Payload stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Authenticated caller, immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub identity: String,
    pub role: Role,
    pub email: String,
    pub expiry: DateTime<Utc>,
}

impl TryFrom<Claims> for Principal {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.user_id.trim().is_empty() {
            return Err(AuthError::Malformed);
        }
        let expiry = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AuthError::Malformed)?;
        Ok(Self {
            identity: claims.user_id,
            role: claims.role,
            email: claims.email,
            expiry,
        })
    }
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: i64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, MicError> {
        if secret.is_empty() {
            return Err(MicError::Config("JWT_SECRET is required in production mode".into()));
        }

        if secret.len() < 32 {
            return Err(MicError::Config("JWT_SECRET must be at least 32 characters".into()));
        }

        let expiry_seconds = i64::try_from(expiry_seconds)
            .map_err(|_| MicError::Config("JWT expiry out of range".into()))?;

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a validator for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: 24 * 60 * 60,
        }
    }

    /// Issue a token for the given identity
    pub fn generate_token(&self, user_id: &str, role: Role, email: &str) -> Result<String, MicError> {
        let now = Utc::now().timestamp();
        self.sign(&Claims {
            user_id: user_id.to_string(),
            role,
            email: email.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
        })
    }

    /// Sign arbitrary claims with this validator's key
    pub fn sign(&self, claims: &Claims) -> Result<String, MicError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| MicError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Decode a credential into a principal.
    ///
    /// Anything not signed with HS256 under this key is `Malformed`; a valid
    /// signature past its `exp` is `Expired`.
    pub fn decode(&self, token: &str) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Principal::try_from(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::Malformed),
            },
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(auth_header: Option<&str>) -> Result<&str, AuthError> {
    let header = auth_header.ok_or(AuthError::Missing)?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into(), 3600)
            .expect("valid secret")
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new(String::new(), 3600).is_err());
    }

    #[test]
    fn test_generate_and_decode() {
        let validator = test_validator();
        let token = validator
            .generate_token("student-1", Role::Student, "s1@example.edu")
            .unwrap();

        let principal = validator.decode(&token).unwrap();
        assert_eq!(principal.identity, "student-1");
        assert_eq!(principal.role, Role::Student);
        assert_eq!(principal.email, "s1@example.edu");
        assert!(principal.expiry > Utc::now());
    }

    #[test]
    fn test_expired_token() {
        let validator = test_validator();
        let now = Utc::now().timestamp();
        let token = validator
            .sign(&Claims {
                user_id: "student-1".into(),
                role: Role::Student,
                email: "s1@example.edu".into(),
                iat: now - 7200,
                exp: now - 60,
            })
            .unwrap();

        assert_eq!(validator.decode(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let validator = test_validator();
        let other = JwtValidator::new("another-secret-that-is-also-32-characters-long".into(), 3600)
            .unwrap();
        let token = other.generate_token("admin-1", Role::Admin, "a@example.edu").unwrap();

        assert_eq!(validator.decode(&token), Err(AuthError::Malformed));
    }

    #[test]
    fn test_other_algorithm_is_malformed() {
        let validator = test_validator();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: "admin-1".into(),
            role: Role::Admin,
            email: "a@example.edu".into(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-at-least-32-characters-long"),
        )
        .unwrap();

        assert_eq!(validator.decode(&token), Err(AuthError::Malformed));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let validator = test_validator();
        assert_eq!(validator.decode("not-a-token"), Err(AuthError::Malformed));
        assert_eq!(validator.decode(""), Err(AuthError::Malformed));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc123")), Ok("abc123"));
        assert_eq!(extract_bearer(None), Err(AuthError::Missing));
        assert_eq!(extract_bearer(Some("abc123")), Err(AuthError::Malformed));
        assert_eq!(extract_bearer(Some("Bearer   ")), Err(AuthError::Malformed));
        assert_eq!(extract_bearer(Some("Basic dXNlcjpwYXNz")), Err(AuthError::Malformed));
    }
}
