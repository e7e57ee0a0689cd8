//! SQLite-backed `UserStore`.

use crate::domain::{AuthError, PasswordHash, StoredUserPatch, User};
use crate::ports::UserStore;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use shared_types::StoreError;
use txn_participant::{run_blocking, SharedConnection};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        salt TEXT NOT NULL
    );
";

const SELECT_USER: &str = "SELECT id, username, email, password_hash, salt FROM users";

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: PasswordHash {
            hash: row.get(3)?,
            salt: row.get(4)?,
        },
    })
}

/// First uniqueness clash for `username`/`email` against users other than `exclude`.
fn find_clash(
    conn: &Connection,
    username: Option<&str>,
    email: Option<&str>,
    exclude: Option<i64>,
) -> rusqlite::Result<Option<AuthError>> {
    let exclude = exclude.unwrap_or(-1);
    if let Some(username) = username {
        let taken = conn
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1 AND id != ?2",
                params![username, exclude],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Ok(Some(AuthError::UsernameTaken));
        }
    }
    if let Some(email) = email {
        let taken = conn
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1 AND id != ?2",
                params![email, exclude],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Ok(Some(AuthError::EmailTaken));
        }
    }
    Ok(None)
}

pub struct SqliteUserStore {
    conn: SharedConnection,
}

impl SqliteUserStore {
    /// Wrap `conn`, creating the `users` table if needed.
    pub fn new(conn: SharedConnection) -> Result<Self, StoreError> {
        conn.lock()
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::new(format!("failed to create users table: {e}")))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(
        &self,
        username: String,
        email: String,
        password: PasswordHash,
    ) -> Result<i64, AuthError> {
        run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            if let Some(clash) = find_clash(&tx, Some(&username), Some(&email), None)? {
                return Ok(Err(clash));
            }
            tx.execute(
                "INSERT INTO users (username, email, password_hash, salt) VALUES (?1, ?2, ?3, ?4)",
                params![username, email, password.hash, password.salt],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Ok(id))
        })
        .await?
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email = email.to_string();
        let user = run_blocking(&self.conn, move |conn| {
            conn.query_row(&format!("{SELECT_USER} WHERE email = ?1"), [email], read_user)
                .optional()
        })
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let users = run_blocking(&self.conn, |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY id"))?;
            let users = stmt
                .query_map([], read_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await?;
        Ok(users)
    }

    async fn update(&self, id: i64, patch: StoredUserPatch) -> Result<(), AuthError> {
        run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(Err(AuthError::NotFound(id)));
            }
            if let Some(clash) =
                find_clash(&tx, patch.username.as_deref(), patch.email.as_deref(), Some(id))?
            {
                return Ok(Err(clash));
            }

            if let Some(username) = &patch.username {
                tx.execute(
                    "UPDATE users SET username = ?2 WHERE id = ?1",
                    params![id, username],
                )?;
            }
            if let Some(email) = &patch.email {
                tx.execute("UPDATE users SET email = ?2 WHERE id = ?1", params![id, email])?;
            }
            if let Some(password) = &patch.password {
                tx.execute(
                    "UPDATE users SET password_hash = ?2, salt = ?3 WHERE id = ?1",
                    params![id, password.hash, password.salt],
                )?;
            }
            tx.commit()?;
            Ok(Ok(()))
        })
        .await?
    }

    async fn ping(&self) -> Result<(), StoreError> {
        run_blocking(&self.conn, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txn_participant::open_connection;

    fn store() -> SqliteUserStore {
        SqliteUserStore::new(open_connection(":memory:").unwrap()).unwrap()
    }

    async fn add(store: &SqliteUserStore, username: &str, email: &str) -> i64 {
        store
            .insert(username.into(), email.into(), PasswordHash::generate("pw"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = store();
        let id = add(&store, "alice", "alice@example.com").await;

        let user = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert!(user.password.verify("pw"));
        assert_eq!(store.find_by_email("nobody@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_username_checked_before_email() {
        let store = store();
        add(&store, "alice", "alice@example.com").await;

        let err = store
            .insert("alice".into(), "alice@example.com".into(), PasswordHash::generate("x"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::UsernameTaken);

        let err = store
            .insert("bob".into(), "alice@example.com".into(), PasswordHash::generate("x"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailTaken);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_fields_and_password() {
        let store = store();
        let id = add(&store, "alice", "alice@example.com").await;

        let patch = StoredUserPatch {
            username: Some("alice2".into()),
            email: None,
            password: Some(PasswordHash::generate("new-pw")),
        };
        store.update(id, patch).await.unwrap();

        let user = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(user.username, "alice2");
        assert!(user.password.verify("new-pw"));
        assert!(!user.password.verify("pw"));
    }

    #[tokio::test]
    async fn test_update_clash_and_missing() {
        let store = store();
        let alice = add(&store, "alice", "alice@example.com").await;
        add(&store, "bob", "bob@example.com").await;

        let patch = StoredUserPatch {
            email: Some("bob@example.com".into()),
            ..StoredUserPatch::default()
        };
        assert_eq!(store.update(alice, patch).await, Err(AuthError::EmailTaken));

        // Keeping one's own username is not a clash.
        let patch = StoredUserPatch {
            username: Some("alice".into()),
            ..StoredUserPatch::default()
        };
        assert_eq!(store.update(alice, patch).await, Ok(()));

        assert_eq!(
            store.update(99, StoredUserPatch::default()).await,
            Err(AuthError::NotFound(99))
        );
    }
}
