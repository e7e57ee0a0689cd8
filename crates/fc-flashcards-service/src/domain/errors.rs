//! Flashcard error types.

use shared_types::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashcardError {
    #[error("flashcard set {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The write is durable but the cached projection may outlive it.
    #[error("flashcard set {set_id} was saved but its cached copy could not be removed: {message}")]
    CacheInvalidation { set_id: i64, message: String },
}

/// Projection cache failures. Never fatal on the read path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}
