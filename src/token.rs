//! Session tokens: HS256 JWTs carrying `email` and `role`.

use crate::store::Role;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, SystemTime},
};
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub role: Role,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("token TTL must be at least one second")]
    TtlOutOfRange,
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    ttl_seconds: i64,
}

impl TokenIssuer {
    /// # Errors
    /// Returns an error if the secret is empty or the TTL is zero.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, TokenError> {
        let secret = secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let ttl_seconds = i64::try_from(ttl.as_secs()).map_err(|_| TokenError::TtlOutOfRange)?;
        if ttl_seconds == 0 {
            return Err(TokenError::TtlOutOfRange);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            ttl_seconds,
        })
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `email`/`role` that expires after the configured TTL.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, email: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(email, role, now_unix_seconds())
    }

    fn issue_at(&self, email: &str, role: Role, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            email: email.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(TokenError::Sign)
    }

    /// Check signature and expiry, returning the embedded claims.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, tampered with, or expired.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &"HS256")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
