//! Participant error types.

use shared_types::{StoreError, TransactionId, TransactionStatus, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParticipantError {
    /// No record, or (under `Strict`) not in the state the operation needs.
    #[error("transaction {0} not found")]
    NotFound(TransactionId),

    /// The record exists in a state the operation may not leave.
    #[error("transaction {id} is already {status}")]
    Conflict {
        id: TransactionId,
        status: TransactionStatus,
    },

    #[error("invalid transaction id: {0}")]
    InvalidId(#[from] ValidationError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}
