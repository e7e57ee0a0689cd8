//! # Outbound Ports

use crate::domain::{AuthError, PasswordHash, StoredUserPatch, User};
use async_trait::async_trait;
use shared_types::StoreError;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and return its id.
    ///
    /// # Errors
    /// - `UsernameTaken` / `EmailTaken`: uniqueness clash, username checked first
    async fn insert(
        &self,
        username: String,
        email: String,
        password: PasswordHash,
    ) -> Result<i64, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn list(&self) -> Result<Vec<User>, AuthError>;

    /// Apply `patch` to user `id` atomically.
    ///
    /// # Errors
    /// - `NotFound`: no such user
    /// - `UsernameTaken` / `EmailTaken`: the value belongs to another user
    async fn update(&self, id: i64, patch: StoredUserPatch) -> Result<(), AuthError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
