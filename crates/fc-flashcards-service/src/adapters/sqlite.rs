//! SQLite-backed `FlashcardStore`.

use crate::domain::{Flashcard, FlashcardError, FlashcardSet, FlashcardSetPatch, NewFlashcardSet};
use crate::ports::FlashcardStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use shared_types::{StoreError, SubjectId};
use std::collections::HashMap;
use txn_participant::{run_blocking, SharedConnection};

// AUTOINCREMENT keeps ids of deleted sets from being reused, so a new set can
// never be served a projection cached under an old one's key.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS flashcard_sets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        subject TEXT NOT NULL,
        creator_id INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS flashcards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        set_id INTEGER NOT NULL REFERENCES flashcard_sets (id) ON DELETE CASCADE,
        question TEXT NOT NULL,
        answer TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_flashcards_set_id ON flashcards (set_id);
";

const SELECT_SET: &str = "SELECT id, title, subject, creator_id, created_at FROM flashcard_sets";
const SELECT_CARD: &str = "SELECT id, set_id, question, answer FROM flashcards";

fn read_set(row: &Row<'_>) -> rusqlite::Result<FlashcardSet> {
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(FlashcardSet {
        id: row.get(0)?,
        title: row.get(1)?,
        subject: row.get(2)?,
        creator_id: SubjectId(row.get(3)?),
        created_at,
        cards: Vec::new(),
    })
}

fn read_card(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        set_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
    })
}

fn load_set(conn: &Connection, id: i64) -> rusqlite::Result<Option<FlashcardSet>> {
    let Some(mut set) = conn
        .query_row(&format!("{SELECT_SET} WHERE id = ?1"), [id], read_set)
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(&format!("{SELECT_CARD} WHERE set_id = ?1 ORDER BY id"))?;
    set.cards = stmt
        .query_map([id], read_card)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(set))
}

pub struct SqliteFlashcardStore {
    conn: SharedConnection,
}

impl SqliteFlashcardStore {
    /// Wrap `conn`, creating the flashcard tables if needed.
    pub fn new(conn: SharedConnection) -> Result<Self, StoreError> {
        conn.lock()
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::new(format!("failed to create flashcard tables: {e}")))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl FlashcardStore for SqliteFlashcardStore {
    async fn list_sets(&self) -> Result<Vec<FlashcardSet>, FlashcardError> {
        let sets = run_blocking(&self.conn, |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_SET} ORDER BY id"))?;
            let mut sets = stmt
                .query_map([], read_set)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut stmt = conn.prepare(&format!("{SELECT_CARD} ORDER BY id"))?;
            let mut by_set: HashMap<i64, Vec<Flashcard>> = HashMap::new();
            for card in stmt.query_map([], read_card)? {
                let card = card?;
                by_set.entry(card.set_id).or_default().push(card);
            }
            for set in &mut sets {
                set.cards = by_set.remove(&set.id).unwrap_or_default();
            }
            Ok(sets)
        })
        .await?;
        Ok(sets)
    }

    async fn get_set(&self, id: i64) -> Result<Option<FlashcardSet>, FlashcardError> {
        Ok(run_blocking(&self.conn, move |conn| load_set(conn, id)).await?)
    }

    async fn create_set(
        &self,
        creator: SubjectId,
        new: NewFlashcardSet,
        created_at: DateTime<Utc>,
    ) -> Result<FlashcardSet, FlashcardError> {
        let created = run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO flashcard_sets (title, subject, creator_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![new.title, new.subject, creator.0, created_at.to_rfc3339()],
            )?;
            let set_id = tx.last_insert_rowid();
            for card in &new.cards {
                tx.execute(
                    "INSERT INTO flashcards (set_id, question, answer) VALUES (?1, ?2, ?3)",
                    params![set_id, card.question, card.answer],
                )?;
            }
            let set = load_set(&tx, set_id)?;
            tx.commit()?;
            Ok(set)
        })
        .await?;

        created.ok_or_else(|| StoreError::new("created flashcard set vanished").into())
    }

    async fn update_set(&self, id: i64, patch: FlashcardSetPatch) -> Result<(), FlashcardError> {
        run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row("SELECT 1 FROM flashcard_sets WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(Err(FlashcardError::NotFound(id)));
            }

            if let Some(title) = &patch.title {
                tx.execute(
                    "UPDATE flashcard_sets SET title = ?2 WHERE id = ?1",
                    params![id, title],
                )?;
            }
            if let Some(subject) = &patch.subject {
                tx.execute(
                    "UPDATE flashcard_sets SET subject = ?2 WHERE id = ?1",
                    params![id, subject],
                )?;
            }

            for card in &patch.cards {
                let updated = match card.card_id {
                    Some(card_id) => {
                        tx.execute(
                            "UPDATE flashcards
                             SET question = COALESCE(?3, question), answer = COALESCE(?4, answer)
                             WHERE id = ?1 AND set_id = ?2",
                            params![card_id, id, card.question, card.answer],
                        )? > 0
                    }
                    None => false,
                };
                if updated {
                    continue;
                }
                let new_card = match card.as_new_card() {
                    Ok(new_card) => new_card,
                    // Dropping `tx` rolls back the partial update.
                    Err(e) => return Ok(Err(e)),
                };
                tx.execute(
                    "INSERT INTO flashcards (set_id, question, answer) VALUES (?1, ?2, ?3)",
                    params![id, new_card.question, new_card.answer],
                )?;
            }

            tx.commit()?;
            Ok(Ok(()))
        })
        .await?
    }

    async fn delete_set(&self, id: i64) -> Result<(), FlashcardError> {
        let deleted = run_blocking(&self.conn, move |conn| {
            conn.execute("DELETE FROM flashcard_sets WHERE id = ?1", [id])
        })
        .await?;
        if deleted == 0 {
            return Err(FlashcardError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        run_blocking(&self.conn, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
        .await
    }
}
