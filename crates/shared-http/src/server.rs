//! Service bootstrap: middleware assembly, listener, and shutdown.

use crate::admission::{AdmissionController, AdmissionLayer};
use crate::config::{AdmissionConfig, CorsConfig, HttpConfig, RateLimitConfig};
use crate::cors::create_cors_layer;
use crate::metrics::ServiceMetrics;
use crate::rate_limit::{RateLimitLayer, RateLimitState};
use crate::tracing::TracingLayer;
use axum::Router;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// The per-instance middleware state, built once at startup.
#[derive(Clone)]
pub struct MiddlewareStack {
    pub admission: Arc<AdmissionController>,
    pub rate_limit: Arc<RateLimitState>,
    pub metrics: Arc<ServiceMetrics>,
    cors: CorsConfig,
}

impl MiddlewareStack {
    pub fn new(admission: &AdmissionConfig, rate_limit: &RateLimitConfig, cors: &CorsConfig) -> Self {
        Self {
            admission: Arc::new(AdmissionController::new(admission)),
            rate_limit: Arc::new(RateLimitState::new(rate_limit.clone())),
            metrics: Arc::new(ServiceMetrics::new()),
            cors: cors.clone(),
        }
    }

    /// Wrap `router` so requests pass CORS, tracing, rate limiting, and
    /// admission, in that order.
    pub fn apply(&self, router: Router) -> Router {
        // Router::layer wraps outward: the last layer added runs first.
        router
            .layer(AdmissionLayer::new(Arc::clone(&self.admission)))
            .layer(RateLimitLayer::new(Arc::clone(&self.rate_limit)))
            .layer(TracingLayer::new(Arc::clone(&self.metrics)))
            .layer(create_cors_layer(&self.cors))
    }

    /// Body of the `/metrics` endpoint.
    pub fn snapshot(&self) -> Value {
        json!({
            "requests": self.metrics.to_json(),
            "admission": self.admission.to_json(),
            "rate_limit": {
                "tracked_clients": self.rate_limit.tracked_clients(),
                "rejected": self.rate_limit.rejected_total(),
            },
        })
    }
}

/// Bind `config.addr()` and serve `router` until `shutdown` resolves.
///
/// Peer addresses are attached to each request so the rate limiter can key
/// on them when no forwarding header is present.
pub async fn serve<F>(router: Router, config: &HttpConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
