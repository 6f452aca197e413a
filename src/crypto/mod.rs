//! Password hashing and identity tokens.
//!
//! Passwords are hashed with Argon2id. Identity tokens are HS256 JWTs
//! carrying the user id, email and role.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::AuthConfig;
use crate::db::{Role, User};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random hex secret
fn generate_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// A verified caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies identity tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_hours: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_hours,
        }
    }

    /// Build from config, generating a throwaway secret when none is set.
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Self::new(secret, config.token_ttl_hours),
            _ => {
                warn!("No JWT secret configured; tokens will not survive a restart");
                Self::new(&generate_secret(), config.token_ttl_hours)
            }
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = Duration::try_hours(self.ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::Signing(format!("token lifetime of {}h overflows", self.ttl_hours))
            })?;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        use jsonwebtoken::errors::ErrorKind;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        Ok(Identity {
            id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}
