//! Salted password digests.
//!
//! `hex(SHA-256(salt || password))` with a random per-user salt.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// A password digest and the salt it was computed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

impl PasswordHash {
    /// Hash `password` under a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        Self::with_salt(password, salt)
    }

    pub fn with_salt(password: &str, salt: impl Into<String>) -> Self {
        let salt = salt.into();
        let hash = digest(&salt, password);
        Self { hash, salt }
    }

    /// Constant-time check of `password` against the stored digest.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        candidate.as_bytes().ct_eq(self.hash.as_bytes()).into()
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
