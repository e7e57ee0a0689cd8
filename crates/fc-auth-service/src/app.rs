//! Wiring of the user store, participant, and middleware into one router.

use crate::adapters::SqliteUserStore;
use crate::config::AuthConfig;
use crate::routes::{self, AppState};
use crate::service::AccountService;
use axum::Router;
use shared_http::MiddlewareStack;
use shared_types::{StoreError, SystemTimeSource, TimeSource, TokenSigner};
use std::sync::Arc;
use txn_participant::{Participant, SharedConnection, SqliteTransactionStore, TransactionRoutesState};

pub struct AuthApp {
    pub router: Router,
    pub state: AppState,
    pub participant: Arc<Participant>,
}

/// Build the service over `conn`, which holds both `users` and the
/// participant's `transactions` table. `signer` issues login tokens.
pub fn build_app(
    config: &AuthConfig,
    conn: SharedConnection,
    signer: Arc<TokenSigner>,
) -> Result<AuthApp, StoreError> {
    build_app_with_time(config, conn, signer, Arc::new(SystemTimeSource))
}

/// As [`build_app`], with the participant reading `time`.
pub fn build_app_with_time(
    config: &AuthConfig,
    conn: SharedConnection,
    signer: Arc<TokenSigner>,
    time: Arc<dyn TimeSource>,
) -> Result<AuthApp, StoreError> {
    let middleware = MiddlewareStack::new(&config.admission, &config.rate_limit, &config.cors);

    let accounts = Arc::new(AccountService::new(
        Arc::new(SqliteUserStore::new(Arc::clone(&conn))?),
        signer,
    ));

    let participant = Arc::new(Participant::new(
        Arc::new(SqliteTransactionStore::new(conn)?),
        time,
        config.participant.clone(),
    ));

    let state = AppState {
        accounts,
        middleware: middleware.clone(),
    };

    let transactions = txn_participant::routes(TransactionRoutesState {
        participant: participant.clone(),
        metrics: Arc::clone(&middleware.metrics),
    });
    let router = middleware.apply(routes::router(state.clone()).merge(transactions));

    Ok(AuthApp {
        router,
        state,
        participant,
    })
}
