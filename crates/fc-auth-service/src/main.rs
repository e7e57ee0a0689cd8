//! Auth service binary.

use anyhow::{Context, Result};
use fc_auth_service::{build_app, AuthConfig};
use shared_http::{init_tracing, serve, shutdown_signal};
use shared_types::TokenSigner;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use txn_participant::{open_connection, spawn_sweeper};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let config = AuthConfig::load().context("invalid auth configuration")?;
    info!(port = config.http.port, "Starting auth service");

    let conn = open_connection(&config.database_url).context("failed to open database")?;
    let signer = TokenSigner::new(&config.token_secret, config.token_ttl)
        .context("invalid token secret")?;
    let app = build_app(&config, conn, Arc::new(signer))?;

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

    info!("Auth service stopped");
    Ok(())
}
