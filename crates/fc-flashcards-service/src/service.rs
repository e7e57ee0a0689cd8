//! # Cache-Aside Flashcard Service
//!
//! Reads check the projection cache first and fill it from the store on a
//! miss. Writes go to the store, then remove the cached projection before
//! the caller is answered.
//!
//! ```text
//! get_set:    cache ──hit──→ (projection, Cache)
//!               │
//!              miss → store → cache.set_with_ttl → (projection, Store)
//!
//! update_set / delete_set:  store write → bump generation → invalidate → reply
//! ```
//!
//! ## Racing fills
//!
//! A reader that loaded a set before a write may finish its cache fill after
//! that write's invalidation. Each set id carries an invalidation generation:
//! the reader records it before the store read, skips the fill if it moved,
//! and deletes its own fill if it moved while the fill was in flight. Either
//! the reader sees the bump, or the bump (and the writer's delete) comes after
//! the fill. A completed write is therefore never followed by a cached
//! projection older than it.
//!
//! The cache is never authoritative. A failed cache read is a miss, and a
//! failed fill is logged and ignored. A failed invalidation is reported,
//! because the write is already stored and a stale copy may be served until
//! its TTL expires.

use crate::domain::{
    FlashcardError, FlashcardSet, FlashcardSetPatch, FlashcardSetProjection, NewFlashcardSet,
    ProjectionSource,
};
use crate::ports::{FlashcardStore, ProjectionCache};
use chrono::Utc;
use dashmap::DashMap;
use shared_http::ServiceMetrics;
use shared_types::SubjectId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_KEY_PREFIX: &str = "flashcard_set_";

pub struct CacheAside {
    store: Arc<dyn FlashcardStore>,
    cache: Arc<dyn ProjectionCache>,
    ttl: Duration,
    key_prefix: String,
    metrics: Arc<ServiceMetrics>,
    /// Invalidation count per set id. Entries are kept after delete so a
    /// generation never resets.
    generations: DashMap<i64, u64>,
}

impl CacheAside {
    pub fn new(
        store: Arc<dyn FlashcardStore>,
        cache: Arc<dyn ProjectionCache>,
        ttl: Duration,
        key_prefix: impl Into<String>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            store,
            cache,
            ttl,
            key_prefix: key_prefix.into(),
            metrics,
            generations: DashMap::new(),
        }
    }

    pub fn cache_key(&self, set_id: i64) -> String {
        format!("{}{}", self.key_prefix, set_id)
    }

    pub fn store(&self) -> &Arc<dyn FlashcardStore> {
        &self.store
    }

    fn generation(&self, set_id: i64) -> u64 {
        self.generations.get(&set_id).map_or(0, |g| *g)
    }

    /// All sets, read straight from the store.
    pub async fn list_sets(&self) -> Result<Vec<FlashcardSetProjection>, FlashcardError> {
        let sets = self.store.list_sets().await?;
        Ok(sets.iter().map(FlashcardSet::projection).collect())
    }

    pub async fn get_set(
        &self,
        set_id: i64,
    ) -> Result<(FlashcardSetProjection, ProjectionSource), FlashcardError> {
        let key = self.cache_key(set_id);

        if let Some(projection) = self.cached(&key).await {
            self.metrics.record_cache_hit();
            debug!(set_id, "Projection served from cache");
            return Ok((projection, ProjectionSource::Cache));
        }
        self.metrics.record_cache_miss();
        debug!(set_id, "Projection cache miss");

        let generation = self.generation(set_id);
        let set = self
            .store
            .get_set(set_id)
            .await?
            .ok_or(FlashcardError::NotFound(set_id))?;
        let projection = set.projection();

        self.fill(set_id, &key, &projection, generation).await;
        Ok((projection, ProjectionSource::Store))
    }

    /// Cache `projection` unless a write to `set_id` happened since
    /// `generation` was read.
    async fn fill(
        &self,
        set_id: i64,
        key: &str,
        projection: &FlashcardSetProjection,
        generation: u64,
    ) {
        if self.generation(set_id) != generation {
            debug!(set_id, "Set changed during load, not caching");
            return;
        }
        let encoded = match serde_json::to_string(projection) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(set_id, error = %e, "Failed to encode projection");
                return;
            }
        };
        if let Err(e) = self.cache.set_with_ttl(key, &encoded, self.ttl).await {
            warn!(set_id, error = %e, "Failed to cache projection");
            return;
        }
        if self.generation(set_id) != generation {
            debug!(set_id, "Set changed during fill, dropping filled projection");
            if let Err(e) = self.cache.invalidate(key).await {
                warn!(set_id, error = %e, "Failed to drop raced projection");
            }
        }
    }

    /// Cached projection under `key`, if present and decodable.
    async fn cached(&self, key: &str) -> Option<FlashcardSetProjection> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(projection) => Some(projection),
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                if let Err(e) = self.cache.invalidate(key).await {
                    warn!(key, error = %e, "Failed to drop undecodable cache entry");
                }
                None
            }
        }
    }

    /// New ids have no cached projection, so creation invalidates nothing.
    pub async fn create_set(
        &self,
        creator: SubjectId,
        new: NewFlashcardSet,
    ) -> Result<FlashcardSet, FlashcardError> {
        new.validate()?;
        let set = self.store.create_set(creator, new, Utc::now()).await?;
        info!(set_id = set.id, creator = %creator, "Flashcard set created");
        Ok(set)
    }

    pub async fn update_set(
        &self,
        set_id: i64,
        patch: FlashcardSetPatch,
    ) -> Result<(), FlashcardError> {
        patch.validate()?;
        self.store.update_set(set_id, patch).await?;
        self.invalidate(set_id).await?;
        info!(set_id, "Flashcard set updated");
        Ok(())
    }

    pub async fn delete_set(&self, set_id: i64) -> Result<(), FlashcardError> {
        self.store.delete_set(set_id).await?;
        self.invalidate(set_id).await?;
        info!(set_id, "Flashcard set deleted");
        Ok(())
    }

    /// Drop the cached projection of `set_id`. Every mutation path ends here.
    pub async fn invalidate(&self, set_id: i64) -> Result<(), FlashcardError> {
        *self.generations.entry(set_id).or_insert(0) += 1;
        let key = self.cache_key(set_id);
        match self.cache.invalidate(&key).await {
            Ok(()) => {
                self.metrics.record_cache_invalidation();
                debug!(set_id, "Projection invalidated");
                Ok(())
            }
            Err(e) => {
                error!(set_id, error = %e, "Projection invalidation failed after write");
                Err(FlashcardError::CacheInvalidation {
                    set_id,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryProjectionCache, SqliteFlashcardStore};
    use crate::domain::{CacheError, CardPatch, NewFlashcard};
    use async_trait::async_trait;
    use chrono::DateTime;
    use shared_types::StoreError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use txn_participant::open_connection;

    /// Wraps the memory cache and fails selected operations on demand.
    #[derive(Default)]
    struct FlakyCache {
        inner: MemoryProjectionCache,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        fail_invalidate: AtomicBool,
    }

    fn down() -> CacheError {
        CacheError::Unavailable("connection refused".into())
    }

    #[async_trait]
    impl ProjectionCache for FlakyCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(down());
            }
            self.inner.get(key).await
        }

        async fn set_with_ttl(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(down());
            }
            self.inner.set_with_ttl(key, value, ttl).await
        }

        async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
            if self.fail_invalidate.load(Ordering::SeqCst) {
                return Err(down());
            }
            self.inner.invalidate(key).await
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    /// A store whose next `get_set` reports once it has read the row, then
    /// waits for a release before returning it.
    struct GatedStore {
        inner: SqliteFlashcardStore,
        gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: SqliteFlashcardStore::new(open_connection(":memory:").unwrap()).unwrap(),
                gate: Mutex::new(None),
            }
        }

        /// Arm the gate. Returns (row read, release).
        fn arm(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
            let (loaded_tx, loaded_rx) = oneshot::channel();
            let (release_tx, release_rx) = oneshot::channel();
            *self.gate.lock().unwrap() = Some((loaded_tx, release_rx));
            (loaded_rx, release_tx)
        }
    }

    #[async_trait]
    impl FlashcardStore for GatedStore {
        async fn list_sets(&self) -> Result<Vec<FlashcardSet>, FlashcardError> {
            self.inner.list_sets().await
        }

        async fn get_set(&self, id: i64) -> Result<Option<FlashcardSet>, FlashcardError> {
            let loaded = self.inner.get_set(id).await;
            let gate = self.gate.lock().unwrap().take();
            if let Some((loaded_tx, release_rx)) = gate {
                let _ = loaded_tx.send(());
                let _ = release_rx.await;
            }
            loaded
        }

        async fn create_set(
            &self,
            creator: SubjectId,
            new: NewFlashcardSet,
            created_at: DateTime<Utc>,
        ) -> Result<FlashcardSet, FlashcardError> {
            self.inner.create_set(creator, new, created_at).await
        }

        async fn update_set(
            &self,
            id: i64,
            patch: FlashcardSetPatch,
        ) -> Result<(), FlashcardError> {
            self.inner.update_set(id, patch).await
        }

        async fn delete_set(&self, id: i64) -> Result<(), FlashcardError> {
            self.inner.delete_set(id).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    fn gated_service() -> (Arc<CacheAside>, Arc<GatedStore>) {
        let store = Arc::new(GatedStore::new());
        let service = CacheAside::new(
            store.clone(),
            Arc::new(MemoryProjectionCache::new()),
            DEFAULT_CACHE_TTL,
            DEFAULT_KEY_PREFIX,
            Arc::new(ServiceMetrics::new()),
        );
        (Arc::new(service), store)
    }

    fn service(cache: Arc<dyn ProjectionCache>) -> (CacheAside, Arc<ServiceMetrics>) {
        let store = SqliteFlashcardStore::new(open_connection(":memory:").unwrap()).unwrap();
        let metrics = Arc::new(ServiceMetrics::new());
        let service = CacheAside::new(
            Arc::new(store),
            cache,
            DEFAULT_CACHE_TTL,
            DEFAULT_KEY_PREFIX,
            Arc::clone(&metrics),
        );
        (service, metrics)
    }

    fn new_set(title: &str) -> NewFlashcardSet {
        NewFlashcardSet {
            title: title.into(),
            subject: "Y".into(),
            cards: vec![NewFlashcard {
                question: "q".into(),
                answer: "a".into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_store_then_cache() {
        let cache = Arc::new(MemoryProjectionCache::new());
        let (service, metrics) = service(cache.clone());
        let set = service.create_set(SubjectId(7), new_set("X")).await.unwrap();

        let (first, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Store);
        let (second, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Cache);
        assert_eq!(first, second);
        assert!(cache.get(&service.cache_key(set.id)).await.unwrap().is_some());

        let snapshot = metrics.to_json();
        assert_eq!(snapshot["cache"]["hits"], 1);
        assert_eq!(snapshot["cache"]["misses"], 1);
    }

    #[tokio::test]
    async fn test_update_forces_reload() {
        let (service, _) = service(Arc::new(MemoryProjectionCache::new()));
        let set = service.create_set(SubjectId(7), new_set("Before")).await.unwrap();
        service.get_set(set.id).await.unwrap();

        let patch = FlashcardSetPatch {
            title: Some("After".into()),
            subject: None,
            cards: vec![CardPatch {
                card_id: Some(set.cards[0].id),
                question: None,
                answer: Some("a2".into()),
            }],
        };
        service.update_set(set.id, patch).await.unwrap();

        let (projection, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Store);
        assert_eq!(projection.title, "After");
        assert_eq!(projection.cards[0].answer, "a2");
    }

    #[tokio::test]
    async fn test_delete_leaves_no_stale_read() {
        let (service, _) = service(Arc::new(MemoryProjectionCache::new()));
        let set = service.create_set(SubjectId(7), new_set("Doomed")).await.unwrap();
        let (_, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Store);

        service.delete_set(set.id).await.unwrap();
        assert_eq!(
            service.get_set(set.id).await,
            Err(FlashcardError::NotFound(set.id))
        );
    }

    #[tokio::test]
    async fn test_missing_set_is_not_cached() {
        let cache = Arc::new(MemoryProjectionCache::new());
        let (service, _) = service(cache.clone());
        assert_eq!(service.get_set(5).await, Err(FlashcardError::NotFound(5)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_outage_degrades_to_store() {
        let cache = Arc::new(FlakyCache::default());
        cache.fail_reads.store(true, Ordering::SeqCst);
        cache.fail_writes.store(true, Ordering::SeqCst);
        let (service, _) = service(cache);
        let set = service.create_set(SubjectId(7), new_set("X")).await.unwrap();

        for _ in 0..2 {
            let (projection, source) = service.get_set(set.id).await.unwrap();
            assert_eq!(source, ProjectionSource::Store);
            assert_eq!(projection.title, "X");
        }
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_replaced() {
        let cache = Arc::new(MemoryProjectionCache::new());
        let (service, _) = service(cache.clone());
        let set = service.create_set(SubjectId(7), new_set("X")).await.unwrap();
        cache.insert_raw(&service.cache_key(set.id), "{not json", DEFAULT_CACHE_TTL);

        let (_, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Store);
        let (_, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Cache);
    }

    #[tokio::test]
    async fn test_invalidation_failure_is_reported_after_write() {
        let cache = Arc::new(FlakyCache::default());
        let (service, _) = service(cache.clone());
        let set = service.create_set(SubjectId(7), new_set("Old")).await.unwrap();
        cache.fail_invalidate.store(true, Ordering::SeqCst);

        let patch = FlashcardSetPatch {
            title: Some("New".into()),
            ..FlashcardSetPatch::default()
        };
        let err = service.update_set(set.id, patch).await.unwrap_err();
        assert!(matches!(err, FlashcardError::CacheInvalidation { set_id, .. } if set_id == set.id));

        // The write itself is durable.
        let stored = service.store().get_set(set.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "New");
    }

    #[tokio::test]
    async fn test_create_validates_before_store() {
        let (service, _) = service(Arc::new(MemoryProjectionCache::new()));
        let err = service
            .create_set(SubjectId(7), NewFlashcardSet {
                title: "".into(),
                subject: "Y".into(),
                cards: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FlashcardError::Validation(_)));
        assert!(service.list_sets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_reader_cannot_recache_after_update() {
        let (service, store) = gated_service();
        let set = service.create_set(SubjectId(7), new_set("Before")).await.unwrap();

        let (loaded, release) = store.arm();
        let reader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_set(set.id).await })
        };
        loaded.await.unwrap();

        let patch = FlashcardSetPatch {
            title: Some("After".into()),
            ..FlashcardSetPatch::default()
        };
        service.update_set(set.id, patch).await.unwrap();

        release.send(()).unwrap();
        let (raced, source) = reader.await.unwrap().unwrap();
        assert_eq!(raced.title, "Before");
        assert_eq!(source, ProjectionSource::Store);

        let (projection, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Store);
        assert_eq!(projection.title, "After");
        let (projection, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Cache);
        assert_eq!(projection.title, "After");
    }

    #[tokio::test]
    async fn test_slow_reader_cannot_recache_after_delete() {
        let (service, store) = gated_service();
        let set = service.create_set(SubjectId(7), new_set("Doomed")).await.unwrap();

        let (loaded, release) = store.arm();
        let reader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_set(set.id).await })
        };
        loaded.await.unwrap();

        service.delete_set(set.id).await.unwrap();
        release.send(()).unwrap();
        let (raced, _) = reader.await.unwrap().unwrap();
        assert_eq!(raced.title, "Doomed");

        assert_eq!(
            service.get_set(set.id).await,
            Err(FlashcardError::NotFound(set.id))
        );
    }

    #[tokio::test]
    async fn test_fill_dropped_when_write_lands_mid_fill() {
        let (service, _) = gated_service();
        let set = service.create_set(SubjectId(7), new_set("X")).await.unwrap();
        let key = service.cache_key(set.id);
        let projection = service.store().get_set(set.id).await.unwrap().unwrap().projection();

        // A write between the generation read and the fill suppresses it.
        let generation = service.generation(set.id);
        service.invalidate(set.id).await.unwrap();
        service.fill(set.id, &key, &projection, generation).await;
        let (_, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Store);

        // An unchanged generation fills normally.
        let (_, source) = service.get_set(set.id).await.unwrap();
        assert_eq!(source, ProjectionSource::Cache);
    }
}
