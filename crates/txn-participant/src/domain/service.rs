//! # Participant Service
//!
//! Implements `ParticipantApi` over any `TransactionStore`.

use super::{
    CommitOutcome, FinalizePolicy, ParticipantConfig, ParticipantError, TransactionRecord,
    TransitionOutcome, InsertOutcome,
};
use crate::ports::{ParticipantApi, TransactionStore};
use async_trait::async_trait;
use shared_types::{TimeSource, TransactionId, TransactionStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Participant {
    store: Arc<dyn TransactionStore>,
    time: Arc<dyn TimeSource>,
    config: ParticipantConfig,
}

impl Participant {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        time: Arc<dyn TimeSource>,
        config: ParticipantConfig,
    ) -> Self {
        Self {
            store,
            time,
            config,
        }
    }

    pub fn config(&self) -> &ParticipantConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    /// Delete an `ABORTED` row. A row already gone counts as deleted.
    async fn purge_aborted(&self, id: &TransactionId) -> Result<(), ParticipantError> {
        match self.store.remove(id, TransactionStatus::Aborted).await? {
            TransitionOutcome::Applied | TransitionOutcome::Absent => Ok(()),
            // A concurrent abort purged the row and the id was prepared again
            // before this delete ran; the new record is left alone.
            TransitionOutcome::Mismatch(status) => Err(ParticipantError::Conflict {
                id: id.clone(),
                status,
            }),
        }
    }
}

// =============================================================================
// PARTICIPANT API
// =============================================================================

#[async_trait]
impl ParticipantApi for Participant {
    async fn prepare(
        &self,
        id: TransactionId,
        payload: serde_json::Value,
    ) -> Result<TransactionRecord, ParticipantError> {
        let record = TransactionRecord::prepared(id, payload, self.time.now());

        match self.store.insert_prepared(&record).await? {
            InsertOutcome::Inserted => {
                info!(transaction_id = %record.id, "Transaction prepared");
                Ok(record)
            }
            InsertOutcome::Exists(status) => {
                warn!(transaction_id = %record.id, %status, "Duplicate prepare rejected");
                Err(ParticipantError::Conflict {
                    id: record.id,
                    status,
                })
            }
        }
    }

    async fn commit(&self, id: &TransactionId) -> Result<CommitOutcome, ParticipantError> {
        let outcome = self
            .store
            .transition(
                id,
                TransactionStatus::Prepared,
                TransactionStatus::Committed,
                self.time.now(),
            )
            .await?;

        match outcome {
            TransitionOutcome::Applied => {
                info!(transaction_id = %id, "Transaction committed");
                Ok(CommitOutcome {
                    already_finalized: false,
                })
            }
            TransitionOutcome::Absent => {
                warn!(transaction_id = %id, "Commit of unknown transaction");
                Err(ParticipantError::NotFound(id.clone()))
            }
            TransitionOutcome::Mismatch(TransactionStatus::Committed) => {
                match self.config.finalize_policy {
                    FinalizePolicy::Idempotent => {
                        debug!(transaction_id = %id, "Repeat commit acknowledged");
                        Ok(CommitOutcome {
                            already_finalized: true,
                        })
                    }
                    FinalizePolicy::Strict => {
                        warn!(transaction_id = %id, "Repeat commit rejected");
                        Err(ParticipantError::NotFound(id.clone()))
                    }
                }
            }
            TransitionOutcome::Mismatch(status) => {
                warn!(transaction_id = %id, %status, "Commit rejected");
                match self.config.finalize_policy {
                    FinalizePolicy::Idempotent => Err(ParticipantError::Conflict {
                        id: id.clone(),
                        status,
                    }),
                    FinalizePolicy::Strict => Err(ParticipantError::NotFound(id.clone())),
                }
            }
        }
    }

    async fn abort(&self, id: &TransactionId) -> Result<(), ParticipantError> {
        let outcome = self
            .store
            .transition(
                id,
                TransactionStatus::Prepared,
                TransactionStatus::Aborted,
                self.time.now(),
            )
            .await?;

        match outcome {
            TransitionOutcome::Applied => {
                self.purge_aborted(id).await?;
                info!(transaction_id = %id, "Transaction aborted and deleted");
                Ok(())
            }
            TransitionOutcome::Absent => {
                warn!(transaction_id = %id, "Abort of unknown transaction");
                Err(ParticipantError::NotFound(id.clone()))
            }
            TransitionOutcome::Mismatch(TransactionStatus::Aborted) => {
                // Leftover from an abort that marked the row but never deleted it.
                self.purge_aborted(id).await?;
                info!(transaction_id = %id, "Aborted leftover deleted");
                Ok(())
            }
            TransitionOutcome::Mismatch(status) => {
                warn!(transaction_id = %id, %status, "Abort rejected");
                Err(ParticipantError::Conflict {
                    id: id.clone(),
                    status,
                })
            }
        }
    }

    async fn get(&self, id: &TransactionId) -> Result<TransactionRecord, ParticipantError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| ParticipantError::NotFound(id.clone()))
    }

    async fn sweep_orphans(&self) -> Result<Vec<TransactionId>, ParticipantError> {
        let now = self.time.now();
        let cutoff = now.saturating_sub(self.config.orphan_timeout.as_millis() as u64);
        let stale = self.store.list_stale_prepared(cutoff).await?;

        let mut swept = Vec::with_capacity(stale.len());
        for id in stale {
            match self.abort(&id).await {
                Ok(()) => swept.push(id),
                // Finalized by the coordinator between listing and abort.
                Err(ParticipantError::NotFound(_)) | Err(ParticipantError::Conflict { .. }) => {
                    debug!(transaction_id = %id, "Orphan resolved before sweep");
                }
                Err(e) => return Err(e),
            }
        }

        if !swept.is_empty() {
            info!(count = swept.len(), "Swept orphaned prepared transactions");
        }
        Ok(swept)
    }
}
