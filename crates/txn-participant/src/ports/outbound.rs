//! # Outbound Port - TransactionStore
//!
//! Each method is one atomic unit against the store. Compare-and-set
//! operations read and write the status under a single store transaction so
//! two concurrent callers cannot both observe `PREPARED`.

use crate::domain::{InsertOutcome, TransactionRecord, TransitionOutcome};
use async_trait::async_trait;
use shared_types::{StoreError, Timestamp, TransactionId, TransactionStatus};

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert `record` unless a row with the same id exists.
    async fn insert_prepared(&self, record: &TransactionRecord) -> Result<InsertOutcome, StoreError>;

    /// Set status to `to` only if it is currently `from`.
    async fn transition(
        &self,
        id: &TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        now: Timestamp,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Delete the row only if its status is `expected`.
    async fn remove(
        &self,
        id: &TransactionId,
        expected: TransactionStatus,
    ) -> Result<TransitionOutcome, StoreError>;

    async fn find(&self, id: &TransactionId) -> Result<Option<TransactionRecord>, StoreError>;

    /// Ids of `PREPARED` rows with `prepared_at < cutoff`, oldest first.
    async fn list_stale_prepared(&self, cutoff: Timestamp) -> Result<Vec<TransactionId>, StoreError>;

    /// Cheap connectivity check for `/status`.
    async fn ping(&self) -> Result<(), StoreError>;
}
