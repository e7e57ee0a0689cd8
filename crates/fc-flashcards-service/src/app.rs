//! Wiring of stores, cache, participant, and middleware into one router.

use crate::adapters::SqliteFlashcardStore;
use crate::config::FlashcardsConfig;
use crate::ports::ProjectionCache;
use crate::routes::{self, AppState};
use crate::service::CacheAside;
use axum::Router;
use shared_http::MiddlewareStack;
use shared_types::{IdentityVerifier, StoreError, SystemTimeSource, TimeSource};
use std::sync::Arc;
use txn_participant::{Participant, SharedConnection, SqliteTransactionStore, TransactionRoutesState};

pub struct FlashcardsApp {
    pub router: Router,
    pub state: AppState,
    pub participant: Arc<Participant>,
}

/// Build the service over `conn`. Both the flashcard tables and the
/// participant's `transactions` table live in the same database.
pub fn build_app(
    config: &FlashcardsConfig,
    conn: SharedConnection,
    cache: Arc<dyn ProjectionCache>,
    verifier: Arc<dyn IdentityVerifier>,
) -> Result<FlashcardsApp, StoreError> {
    build_app_with_time(config, conn, cache, verifier, Arc::new(SystemTimeSource))
}

pub fn build_app_with_time(
    config: &FlashcardsConfig,
    conn: SharedConnection,
    cache: Arc<dyn ProjectionCache>,
    verifier: Arc<dyn IdentityVerifier>,
    time: Arc<dyn TimeSource>,
) -> Result<FlashcardsApp, StoreError> {
    let middleware = MiddlewareStack::new(&config.admission, &config.rate_limit, &config.cors);

    let store = Arc::new(SqliteFlashcardStore::new(Arc::clone(&conn))?);
    let flashcards = Arc::new(CacheAside::new(
        store,
        cache,
        config.cache.ttl,
        config.cache.key_prefix.clone(),
        Arc::clone(&middleware.metrics),
    ));

    let participant = Arc::new(Participant::new(
        Arc::new(SqliteTransactionStore::new(conn)?),
        time,
        config.participant.clone(),
    ));

    let state = AppState {
        flashcards,
        verifier,
        middleware: middleware.clone(),
    };

    let transactions = txn_participant::routes(TransactionRoutesState {
        participant: participant.clone(),
        metrics: Arc::clone(&middleware.metrics),
    });
    let router = middleware.apply(routes::router(state.clone()).merge(transactions));

    Ok(FlashcardsApp {
        router,
        state,
        participant,
    })
}
