//! Identity error types.

use shared_types::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("user {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}
