//! Handshake credential verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use staffhub_core::config::auth::AuthConfig;
use staffhub_core::error::AppError;
use staffhub_core::result::AppResult;
use staffhub_core::types::id::UserId;
use staffhub_entity::user::UserRole;

use super::claims::Claims;

/// Identity extracted from a verified handshake credential.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The authenticated user.
    pub user_id: UserId,
    /// The user's role at token issuance.
    pub role: UserRole,
    /// Display name.
    pub full_name: String,
}

/// Verifies handshake JWTs against the shared HMAC secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish()
    }
}

impl TokenVerifier {
    /// Create a verifier from configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.leeway = config.leeway_seconds;

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify a credential and extract the identity.
    ///
    /// Any failure (bad signature, expired, wrong issuer, malformed) is an
    /// authentication error; the connection is rejected without retry.
    pub fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AppError::authentication(format!("Invalid handshake credential: {e}")))?;

        Ok(AuthenticatedUser {
            user_id: UserId::from_uuid(data.claims.sub),
            role: data.claims.role,
            full_name: data.claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            issuer: "staffhub".to_string(),
            leeway_seconds: 0,
        }
    }

    fn issue(secret: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Manager,
            name: "Test Manager".to_string(),
            iss: "staffhub".to_string(),
            iat: now,
            exp: now + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn test_verify_valid_token() {
        let verifier = TokenVerifier::new(&config());
        let token = issue("test-secret", 3600);
        let user = verifier.verify(&token).expect("valid token");
        assert_eq!(user.role, UserRole::Manager);
    }

    #[test]
    fn test_reject_wrong_secret() {
        let verifier = TokenVerifier::new(&config());
        let token = issue("other-secret", 3600);
        let err = verifier.verify(&token).unwrap_err();
        assert_eq!(err.kind, staffhub_core::error::ErrorKind::Authentication);
    }

    #[test]
    fn test_reject_expired_token() {
        let verifier = TokenVerifier::new(&config());
        let token = issue("test-secret", -60);
        assert!(verifier.verify(&token).is_err());
    }
}
