//! # Access Tokens
//!
//! The auth service issues short-lived bearer tokens; the flashcards service
//! only needs to check them. Both hold the same secret.
//!
//! ## Format
//!
//! ```text
//! <subject>.<expires_at_ms>.<hex(HMAC-SHA256(secret, "<subject>.<expires_at_ms>"))>
//! ```
//!
//! ## Security Properties
//!
//! - **HMAC-SHA256 signatures**: forging a token requires the shared secret
//! - **Constant-time comparison**: MACs are checked with `Mac::verify_slice`
//! - **Time-bounded validity**: tokens expire after the configured TTL

use crate::entities::{SubjectId, Timestamp};
use crate::errors::TokenError;
use crate::time::{SystemTimeSource, TimeSource};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime (15 minutes).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Resolves a bearer credential to the caller it was issued for.
///
/// Route handlers depend on this port, never on a concrete token format.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<SubjectId, TokenError>;
}

/// Issues and verifies HMAC-signed access tokens.
pub struct TokenSigner {
    /// MAC state keyed with the secret; cloned per token.
    keyed: HmacSha256,
    ttl: Duration,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Creates a signer reading the system clock.
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, TokenError> {
        Self::with_time_source(secret, ttl, Arc::new(SystemTimeSource))
    }

    /// # Errors
    /// - `InvalidSecret`: `secret` is empty or rejected as an HMAC key
    pub fn with_time_source(
        secret: impl AsRef<[u8]>,
        ttl: Duration,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }
        let keyed = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidSecret)?;
        Ok(Self { keyed, ttl, time })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `subject` expiring `ttl` from now.
    pub fn issue(&self, subject: SubjectId) -> String {
        let expires_at = self.time.now().saturating_add(self.ttl.as_millis() as u64);
        let body = format!("{}.{}", subject, expires_at);
        let tag = self.mac(&body).finalize().into_bytes();
        format!("{}.{}", body, hex::encode(tag))
    }

    fn mac(&self, body: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(body.as_bytes());
        mac
    }
}

impl IdentityVerifier for TokenSigner {
    fn verify(&self, token: &str) -> Result<SubjectId, TokenError> {
        let (body, tag_hex) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (subject, expires_at) = body.split_once('.').ok_or(TokenError::Malformed)?;

        let subject: SubjectId = subject.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at: Timestamp = expires_at.parse().map_err(|_| TokenError::Malformed)?;
        let tag = hex::decode(tag_hex).map_err(|_| TokenError::Malformed)?;

        self.mac(body)
            .verify_slice(&tag)
            .map_err(|_| TokenError::InvalidSignature)?;

        if self.time.now() >= expires_at {
            return Err(TokenError::Expired {
                expired_at: expires_at,
            });
        }

        Ok(subject)
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, TokenError> {
    let value = header.ok_or(TokenError::Missing)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(TokenError::Malformed)?
        .trim();
    if token.is_empty() {
        return Err(TokenError::Missing);
    }
    Ok(token)
}
