//! Flashcards service binary.

use anyhow::{Context, Result};
use fc_flashcards_service::adapters::{MemoryProjectionCache, RedisProjectionCache};
use fc_flashcards_service::ports::ProjectionCache;
use fc_flashcards_service::{build_app, CacheBackend, FlashcardsConfig};
use shared_http::{init_tracing, serve, shutdown_signal};
use shared_types::TokenSigner;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use txn_participant::{open_connection, spawn_sweeper};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let config = FlashcardsConfig::load().context("invalid flashcards configuration")?;
    info!(port = config.http.port, "Starting flashcards service");

    let conn = open_connection(&config.database_url).context("failed to open database")?;

    let cache: Arc<dyn ProjectionCache> = match config.cache.backend {
        CacheBackend::Redis => Arc::new(
            RedisProjectionCache::connect(&config.cache.redis_url)
                .await
                .context("failed to connect to redis")?,
        ),
        CacheBackend::Memory => {
            warn!("Using in-process projection cache; entries are not shared between instances");
            Arc::new(MemoryProjectionCache::new())
        }
    };

    let verifier = Arc::new(
        TokenSigner::new(&config.token_secret, config.token_ttl)
            .context("invalid token secret")?,
    );
    let app = build_app(&config, conn, cache, verifier)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = config.participant.sweeper_enabled.then(|| {
        spawn_sweeper(
            app.participant.clone(),
            config.participant.sweep_interval,
            Arc::clone(&app.state.middleware.metrics),
            shutdown_rx,
        )
    });
    let rate_limit_cleanup = app.state.middleware.rate_limit.spawn_cleanup();

    serve(app.router, &config.http, shutdown_signal()).await?;

    let _ = shutdown_tx.send(true);
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }
    rate_limit_cleanup.abort();

    info!("Flashcards service stopped");
    Ok(())
}
