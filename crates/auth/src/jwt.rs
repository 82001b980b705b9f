//! Bearer-token verification (HS256).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token could not be decoded: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a compact JWT and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HMAC-SHA256 validator over a shared secret.
///
/// Time-window checks run against our own `issued_at`/`expires_at` claims
/// rather than the registered `exp`/`nbf` claims, so the library's claim
/// validation is disabled and [`validate_claims`] does the deterministic work.
pub struct Hs256JwtValidator {
    key: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};
    use stockpile_core::UserId;

    fn mint(secret: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> String {
        let claims = JwtClaims {
            sub: UserId::new(),
            role: Role::new("admin"),
            store_ids: vec![],
            issued_at,
            expires_at,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_roundtrips() {
        let now = Utc::now();
        let token = mint("secret", now - Duration::minutes(1), now + Duration::minutes(5));
        let validator = Hs256JwtValidator::new("secret");
        let claims = validator.validate(&token, now).unwrap();
        assert_eq!(claims.role, Role::new("admin"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = mint("secret", now - Duration::minutes(1), now + Duration::minutes(5));
        let validator = Hs256JwtValidator::new("other-secret");
        assert!(matches!(
            validator.validate(&token, now),
            Err(JwtError::Decode(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = mint("secret", now - Duration::minutes(10), now - Duration::minutes(5));
        let validator = Hs256JwtValidator::new("secret");
        assert!(matches!(
            validator.validate(&token, now),
            Err(JwtError::Claims(TokenValidationError::Expired))
        ));
    }
}
