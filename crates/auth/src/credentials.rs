//! Password digests.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>`).
//! Cost parameters travel with each digest, so raising them only affects new
//! hashes.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;

const SALT_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid password hashing parameters: {0}")]
    Params(String),

    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hashes and verifies account secrets.
pub trait CredentialVerifier: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, CredentialError>;

    /// `false` for a wrong secret or a malformed digest; never errors.
    fn compare(&self, secret: &str, digest: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct Argon2CredentialVerifier {
    params: Params,
}

impl Argon2CredentialVerifier {
    /// Argon2id with the crate's recommended costs.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Custom memory (KiB) and iteration costs, single lane.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CredentialError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2CredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier for Argon2CredentialVerifier {
    fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let mut bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        let salt =
            SaltString::encode_b64(&bytes).map_err(|e| CredentialError::Hash(e.to_string()))?;

        let digest = self
            .hasher()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;
        Ok(digest.to_string())
    }

    fn compare(&self, secret: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        // Costs are read from `parsed`, not from `self.params`.
        self.hasher()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
