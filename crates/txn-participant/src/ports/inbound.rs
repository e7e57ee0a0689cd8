//! # Inbound Port - ParticipantApi
//!
//! Driving port used by the HTTP routes and the orphan sweeper.

use crate::domain::{CommitOutcome, ParticipantError, TransactionRecord};
use async_trait::async_trait;
use shared_types::TransactionId;

/// The participant's three protocol operations plus operator helpers.
#[async_trait]
pub trait ParticipantApi: Send + Sync {
    /// Phase 1: stage `payload` under `id` as `PREPARED`.
    ///
    /// # Errors
    /// - `Conflict`: a record with this id exists in any state
    /// - `Store`: the store failed; nothing was written
    async fn prepare(
        &self,
        id: TransactionId,
        payload: serde_json::Value,
    ) -> Result<TransactionRecord, ParticipantError>;

    /// Phase 2 (success): `PREPARED` → `COMMITTED`.
    ///
    /// # Errors
    /// - `NotFound`: no record, or a repeat commit under `FinalizePolicy::Strict`
    /// - `Conflict`: an `ABORTED` leftover row exists
    async fn commit(&self, id: &TransactionId) -> Result<CommitOutcome, ParticipantError>;

    /// Phase 2 (failure): discard a `PREPARED` record.
    ///
    /// # Errors
    /// - `NotFound`: no record
    /// - `Conflict`: the record is already `COMMITTED`
    async fn abort(&self, id: &TransactionId) -> Result<(), ParticipantError>;

    async fn get(&self, id: &TransactionId) -> Result<TransactionRecord, ParticipantError>;

    /// Abort every `PREPARED` record older than the orphan timeout.
    /// Returns the ids that were removed.
    async fn sweep_orphans(&self) -> Result<Vec<TransactionId>, ParticipantError>;
}
