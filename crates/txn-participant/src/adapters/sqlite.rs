//! SQLite-backed `TransactionStore`.
//!
//! rusqlite is blocking, so every call runs on the blocking pool via
//! `run_blocking`. The connection sits behind a `parking_lot::Mutex` and is
//! shared with the owning service's own tables.

use crate::domain::{InsertOutcome, TransactionRecord, TransitionOutcome};
use crate::ports::TransactionStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use shared_types::{StoreError, Timestamp, TransactionId, TransactionStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// One SQLite connection shared by every store in a service.
pub type SharedConnection = Arc<Mutex<Connection>>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS transactions (
        transaction_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        data TEXT,
        prepared_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_status_prepared
        ON transactions (status, prepared_at);
";

/// Open a database from a URL such as `sqlite://data/app.db` or `:memory:`.
pub fn open_connection(url: &str) -> Result<SharedConnection, StoreError> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    let conn = if path == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open(path)
    }
    .map_err(|e| StoreError::new(format!("failed to open {path}: {e}")))?;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| StoreError::new(e.to_string()))?;
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(|e| StoreError::new(e.to_string()))?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Run `f` against the shared connection on the blocking pool.
///
/// A rusqlite `Transaction` opened inside `f` and not committed is rolled
/// back when it drops, so an error path leaves no partial writes.
pub async fn run_blocking<T, F>(conn: &SharedConnection, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.lock();
        f(&mut guard)
    })
    .await
    .map_err(|e| StoreError::new(format!("store task failed: {e}")))?
    .map_err(|e| {
        error!(error = %e, "Store operation failed");
        StoreError::new(e.to_string())
    })
}

fn parse_status(raw: String, column: usize) -> rusqlite::Result<TransactionStatus> {
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let id: String = row.get(0)?;
    let id = TransactionId::parse(id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let status = parse_status(row.get(1)?, 1)?;
    let payload = match row.get::<_, Option<String>>(2)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        None => serde_json::Value::Null,
    };
    Ok(TransactionRecord {
        id,
        status,
        payload,
        prepared_at: row.get::<_, i64>(3)? as Timestamp,
        updated_at: row.get::<_, i64>(4)? as Timestamp,
    })
}

fn current_status(conn: &Connection, id: &str) -> rusqlite::Result<Option<TransactionStatus>> {
    conn.query_row(
        "SELECT status FROM transactions WHERE transaction_id = ?1",
        [id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .map(|raw| parse_status(raw, 0))
    .transpose()
}

pub struct SqliteTransactionStore {
    conn: SharedConnection,
}

impl SqliteTransactionStore {
    /// Wrap `conn`, creating the `transactions` table if needed.
    pub fn new(conn: SharedConnection) -> Result<Self, StoreError> {
        conn.lock()
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::new(format!("failed to create transactions table: {e}")))?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(open_connection(":memory:")?)
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.conn
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn insert_prepared(&self, record: &TransactionRecord) -> Result<InsertOutcome, StoreError> {
        let id = record.id.as_str().to_string();
        let status = record.status.as_str();
        let data = serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::new(format!("payload not serializable: {e}")))?;
        let prepared_at = record.prepared_at as i64;
        let updated_at = record.updated_at as i64;

        run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            if let Some(existing) = current_status(&tx, &id)? {
                return Ok(InsertOutcome::Exists(existing));
            }
            tx.execute(
                "INSERT INTO transactions (transaction_id, status, data, prepared_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, status, data, prepared_at, updated_at],
            )?;
            tx.commit()?;
            Ok(InsertOutcome::Inserted)
        })
        .await
    }

    async fn transition(
        &self,
        id: &TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        now: Timestamp,
    ) -> Result<TransitionOutcome, StoreError> {
        let id = id.as_str().to_string();
        run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            let outcome = match current_status(&tx, &id)? {
                None => return Ok(TransitionOutcome::Absent),
                Some(status) if status != from => return Ok(TransitionOutcome::Mismatch(status)),
                Some(_) => {
                    tx.execute(
                        "UPDATE transactions SET status = ?2, updated_at = ?3
                         WHERE transaction_id = ?1",
                        params![id, to.as_str(), now as i64],
                    )?;
                    TransitionOutcome::Applied
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn remove(
        &self,
        id: &TransactionId,
        expected: TransactionStatus,
    ) -> Result<TransitionOutcome, StoreError> {
        let id = id.as_str().to_string();
        run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            let outcome = match current_status(&tx, &id)? {
                None => return Ok(TransitionOutcome::Absent),
                Some(status) if status != expected => {
                    return Ok(TransitionOutcome::Mismatch(status))
                }
                Some(_) => {
                    tx.execute("DELETE FROM transactions WHERE transaction_id = ?1", [&id])?;
                    TransitionOutcome::Applied
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn find(&self, id: &TransactionId) -> Result<Option<TransactionRecord>, StoreError> {
        let id = id.as_str().to_string();
        run_blocking(&self.conn, move |conn| {
            conn.query_row(
                "SELECT transaction_id, status, data, prepared_at, updated_at
                 FROM transactions WHERE transaction_id = ?1",
                [&id],
                read_record,
            )
            .optional()
        })
        .await
    }

    async fn list_stale_prepared(&self, cutoff: Timestamp) -> Result<Vec<TransactionId>, StoreError> {
        run_blocking(&self.conn, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT transaction_id FROM transactions
                 WHERE status = ?1 AND prepared_at < ?2
                 ORDER BY prepared_at",
            )?;
            let ids = stmt
                .query_map(
                    params![TransactionStatus::Prepared.as_str(), cutoff as i64],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter()
                .map(|raw| {
                    TransactionId::parse(raw).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                    })
                })
                .collect()
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        run_blocking(&self.conn, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
        .await
    }
}
