//! Transaction records and store outcomes.

use serde::Serialize;
use shared_types::{Timestamp, TransactionId, TransactionStatus};

/// One staged transaction as persisted by the participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    #[serde(rename = "transaction_id")]
    pub id: TransactionId,
    pub status: TransactionStatus,
    /// Opaque operation payload supplied at prepare time.
    #[serde(rename = "data")]
    pub payload: serde_json::Value,
    /// Milliseconds since epoch.
    pub prepared_at: Timestamp,
    /// Milliseconds since epoch of the last status change.
    pub updated_at: Timestamp,
}

impl TransactionRecord {
    pub fn prepared(id: TransactionId, payload: serde_json::Value, now: Timestamp) -> Self {
        Self {
            id,
            status: TransactionStatus::Prepared,
            payload,
            prepared_at: now,
            updated_at: now,
        }
    }

    /// Age of a `PREPARED` record relative to `now`.
    pub fn age_ms(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.prepared_at)
    }
}

/// Result of `TransactionStore::insert_prepared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with this id already exists; it was left untouched.
    Exists(TransactionStatus),
}

/// Result of a compare-and-set on a record's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    Absent,
    /// The row exists but its status was not the expected one.
    Mismatch(TransactionStatus),
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommitOutcome {
    /// The record was already `COMMITTED` before this call.
    pub already_finalized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let record = TransactionRecord::prepared(
            TransactionId::parse("tx1").unwrap(),
            serde_json::json!({"title": "Bio 101"}),
            1_000,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["transaction_id"], "tx1");
        assert_eq!(json["status"], "prepared");
        assert_eq!(json["data"]["title"], "Bio 101");
        assert_eq!(json["prepared_at"], 1_000);
    }

    #[test]
    fn test_age_saturates() {
        let record =
            TransactionRecord::prepared(TransactionId::parse("tx").unwrap(), serde_json::Value::Null, 500);
        assert_eq!(record.age_ms(1_500), 1_000);
        assert_eq!(record.age_ms(100), 0);
    }
}
