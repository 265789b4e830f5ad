use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

pub mod password;
pub mod policy;

pub use policy::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        let now = Utc::now();
        let expiry_days = config::config().security.jwt_expiry_days;
        Self {
            user_id,
            role,
            exp: (now + Duration::days(expiry_days)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("JWT secret not configured")]
    MissingSecret,
}

pub fn generate_token(claims: &Claims) -> Result<String, TokenError> {
    generate_token_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn verify_token(token: &str) -> Result<Claims, TokenError> {
    verify_token_with_secret(token, &config::config().security.jwt_secret)
}

fn generate_token_with_secret(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Generation(e.to_string()))
}

fn verify_token_with_secret(token: &str, secret: &str) -> Result<Claims, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| TokenError::Invalid(e.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Constant-time comparison via bcrypt; any hash-parse failure counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// URL-safe random token for password resets (64 alphanumeric chars, >256 bits).
pub fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip_preserves_identity() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Role::Moderator);
        let token = generate_token_with_secret(&claims, SECRET).expect("token");
        let decoded = verify_token_with_secret(&token, SECRET).expect("decode");
        assert_eq!(decoded.user_id, user_id);
        assert_eq!(decoded.role, Role::Moderator);
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let claims = Claims::new(Uuid::new_v4(), Role::User);
        let mut token = generate_token_with_secret(&claims, SECRET).expect("token");
        token.push('x');
        assert!(verify_token_with_secret(&token, SECRET).is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let claims = Claims::new(Uuid::new_v4(), Role::User);
        assert!(matches!(
            generate_token_with_secret(&claims, ""),
            Err(TokenError::MissingSecret)
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("Abc12345!").expect("hash");
        assert!(verify_password("Abc12345!", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn reset_tokens_are_long_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
