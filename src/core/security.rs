//! JWT issuing/verification and password hashing.

use crate::config::AppConfig;
use crate::core::error::ServiceError;
use crate::core::traits::TokenAuthenticator;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use di::{Ref, injectable};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
}

/// Token plus identity handed back by signup/signin.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user: CurrentUser,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iat: i64,
    exp: i64,
}

#[injectable(TokenAuthenticator)]
pub struct JwtAuthenticator {
    config: Ref<AppConfig>,
}

impl JwtAuthenticator {
    fn algorithm(&self) -> Result<Algorithm, ServiceError> {
        Algorithm::from_str(&self.config.jwt_algorithm)
            .map_err(|_| ServiceError::Server(anyhow::anyhow!("unsupported JWT algorithm")))
    }
}

impl TokenAuthenticator for JwtAuthenticator {
    fn issue(&self, user_id: &str, email: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.jwt_expiration_minutes);
        let claims = Claims {
            sub: user_id.to_owned(),
            email: Some(email.to_owned()),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        jsonwebtoken::encode(
            &Header::new(self.algorithm()?),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Server(e.into()))
    }

    fn authenticate(&self, token: &str) -> Result<CurrentUser, ServiceError> {
        let mut validation = Validation::new(self.algorithm()?);
        validation.leeway = 0;

        // Claims are typed, so a missing `sub`, a non-string `email`, or a
        // missing `exp` all fail decoding and collapse into the same error.
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|_| ServiceError::Unauthenticated)?;

        if data.claims.sub.trim().is_empty() {
            return Err(ServiceError::Unauthenticated);
        }

        Ok(CurrentUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Server(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }
}
