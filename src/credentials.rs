//! Password hashing and verification with bcrypt.
//!
//! Hashing and verification are CPU bound, so both run on the blocking pool.

use std::{fmt, sync::Arc};
use thiserror::Error;
use tokio::task::{spawn_blocking, JoinError};
use tracing::{error, warn};

pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

// Verified against when the email is unknown so both failure paths cost the same.
const DUMMY_PASSWORD: &str = "passgate-unknown-user";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Build a hasher with the given bcrypt cost.
    ///
    /// # Errors
    /// Returns an error if the cost is outside `4..=31`.
    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)?;

        Ok(Self {
            cost,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Produce a salted digest; every call uses a fresh salt.
    ///
    /// # Errors
    /// Returns an error if bcrypt fails or the blocking task panics.
    pub async fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let password = password.to_owned();
        let cost = self.cost;

        Ok(spawn_blocking(move || bcrypt::hash(password, cost)).await??)
    }

    /// Compare a password with a stored digest. Malformed digests count as a
    /// mismatch.
    pub async fn verify(&self, password: &str, digest: &str) -> bool {
        let password = password.to_owned();
        let digest = digest.to_owned();

        spawn_blocking(move || verify_digest(&password, &digest))
            .await
            .unwrap_or_else(|err| {
                error!("Password verification task failed: {err}");
                false
            })
    }

    /// Burn one verification for a user that does not exist.
    pub async fn verify_dummy(&self, password: &str) {
        let dummy_hash = Arc::clone(&self.dummy_hash);
        let _ = self.verify(password, &dummy_hash).await;
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

fn verify_digest(password: &str, digest: &str) -> bool {
    match bcrypt::verify(password, digest) {
        Ok(valid) => valid,
        Err(err) => {
            warn!("Stored password digest could not be parsed: {err}");
            false
        }
    }
}
