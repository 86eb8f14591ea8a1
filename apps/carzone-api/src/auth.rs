//! JWT authentication module.
//!
//! Handles operator login, token issuance, and bearer token verification.
//!
//! ## Token Flow
//! ```text
//! POST /login {username, password}
//!      │
//!      ▼
//! OperatorIdentity::check ──✗──► 401
//!      │ ✓
//!      ▼
//! TokenAuthenticator::issue → HS256 { sub, iat, exp = iat + lifetime }
//!
//! GET /car/{id}  Authorization: Bearer <token>
//!      │
//!      ▼
//! extract_bearer_token → TokenAuthenticator::verify ──✗──► 401
//!      │ ✓
//!      ▼
//! AuthenticatedSubject(sub) attached to the request
//! ```
//!
//! Tokens are stateless. There is no server-side revocation; a token stays
//! valid until `exp`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use carzone_core::Credentials;

use crate::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (operator username)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Verified subject of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject(pub String);

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenAuthenticator {
    /// Create a new authenticator.
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        TokenAuthenticator {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::seconds(lifetime_secs),
        }
    }

    /// Generate a token for `username`.
    pub fn issue(&self, username: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| ApiError::Internal("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<String, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        // exp is checked with strict inequality; the library allows exp == now
        if claims.exp <= Utc::now().timestamp() {
            return Err(ApiError::Unauthorized("Invalid token: expired".to_string()));
        }

        Ok(claims.sub)
    }
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// The single operator account allowed to log in.
#[derive(Clone)]
pub struct OperatorIdentity {
    username: String,
    password: String,
}

impl OperatorIdentity {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        OperatorIdentity {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Accepts exactly the configured username/password pair.
    pub fn check(&self, credentials: &Credentials) -> Result<(), ApiError> {
        if credentials.username == self.username && credentials.password == self.password {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(
                "Incorrect username or password".to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for OperatorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorIdentity")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new("test-secret", 86_400)
    }

    fn sign(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_jwt_roundtrip() {
        let auth = authenticator();
        let token = auth.issue("admin").unwrap();
        assert_eq!(auth.verify(&token).unwrap(), "admin");
    }

    #[test]
    fn test_issued_token_lifetime() {
        let auth = authenticator();
        let token = auth.issue("admin").unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(
            "test-secret",
            &Claims {
                sub: "admin".to_string(),
                iat: now - 7_200,
                exp: now - 3_600,
            },
        );

        assert!(matches!(
            authenticator().verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(
            "another-secret",
            &Claims {
                sub: "admin".to_string(),
                iat: now,
                exp: now + 3_600,
            },
        );

        assert!(matches!(
            authenticator().verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(authenticator().verify("not.a.jwt").is_err());
        assert!(authenticator().verify("").is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("abc.def"), None);
    }

    #[test]
    fn test_operator_check() {
        let operator = OperatorIdentity::new("admin", "admin123");

        let good = Credentials {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        };
        let bad = Credentials {
            username: "admin".to_string(),
            password: "guess".to_string(),
        };

        assert!(operator.check(&good).is_ok());
        assert!(matches!(operator.check(&bad), Err(ApiError::Unauthorized(_))));
    }
}
