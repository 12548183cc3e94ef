//! Admin credentials: salted password hash check and signed session tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

pub const ADMIN_COOKIE: &str = "admin_token";
pub const TOKEN_TTL_DAYS: i64 = 7;

const HASH_SCHEME: &str = "sha256";
const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("malformed password hash, expected sha256$<salt>$<hex>")]
    MalformedHash,
    #[error("token encoding failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Errors caused by the caller rather than the server.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials | AuthError::InvalidToken)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn generate_salt() -> String {
    Uuid::new_v4().as_simple().to_string()[..16].to_string()
}

/// `sha256$<salt>$<hex digest of salt || password>`
pub fn hash_password(password: &str, salt: &str) -> String {
    format!("{}${}${}", HASH_SCHEME, salt, digest(salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> Result<(), AuthError> {
    let mut parts = stored.splitn(3, '$');
    let (Some(HASH_SCHEME), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedHash);
    };

    let actual = digest(salt, password);
    if bool::from(actual.as_bytes().ct_eq(expected.to_ascii_lowercase().as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

pub fn issue_token(secret: &str) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.sub = Some(ADMIN_SUBJECT.to_string());

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("admin token rejected: {}", e);
            AuthError::InvalidToken
        })
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
