//! # Error Types
//!
//! Errors produced by the shared value types.

use thiserror::Error;

/// Input that cannot become a shared value type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transaction id must not be empty")]
    EmptyTransactionId,

    #[error("transaction id is {len} characters, maximum is {max}")]
    TransactionIdTooLong { len: usize, max: usize },

    #[error("unknown transaction status: {0}")]
    UnknownStatus(String),
}

/// Access token rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No `Authorization: Bearer` credential was supplied.
    #[error("missing bearer token")]
    Missing,

    /// Token is not `<subject>.<expires>.<mac>`.
    #[error("malformed token")]
    Malformed,

    /// MAC does not match the token body.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token expiry is in the past.
    #[error("token expired at {expired_at}")]
    Expired { expired_at: u64 },

    /// The signing secret is unusable; raised at construction only.
    #[error("token secret must not be empty")]
    InvalidSecret,
}

/// The relational store failed or could not be reached.
///
/// Carries the underlying driver message; callers surface it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
