//! # Outbound Ports
//!
//! `FlashcardStore` is the authoritative relational store. `ProjectionCache`
//! is a best-effort key-value cache that is never authoritative.

use crate::domain::{CacheError, FlashcardError, FlashcardSet, FlashcardSetPatch, NewFlashcardSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{StoreError, SubjectId};
use std::time::Duration;

#[async_trait]
pub trait FlashcardStore: Send + Sync {
    async fn list_sets(&self) -> Result<Vec<FlashcardSet>, FlashcardError>;

    async fn get_set(&self, id: i64) -> Result<Option<FlashcardSet>, FlashcardError>;

    /// Insert a set and its cards in one store transaction.
    async fn create_set(
        &self,
        creator: SubjectId,
        new: NewFlashcardSet,
        created_at: DateTime<Utc>,
    ) -> Result<FlashcardSet, FlashcardError>;

    /// Apply `patch` in one store transaction.
    ///
    /// # Errors
    /// - `NotFound`: no such set
    /// - `Validation`: a new card is missing a field; nothing is written
    async fn update_set(&self, id: i64, patch: FlashcardSetPatch) -> Result<(), FlashcardError>;

    /// Delete a set and, by cascade, its cards.
    async fn delete_set(&self, id: i64) -> Result<(), FlashcardError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProjectionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
