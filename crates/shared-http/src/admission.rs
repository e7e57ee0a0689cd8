//! # Admission Controller
//!
//! Bounds the number of requests executing handler bodies at once on one
//! service instance.
//!
//! ## Contract
//!
//! - At most `max_concurrent` permits are held at any moment.
//! - Waiters are served in FIFO order (tokio's semaphore is fair).
//! - A permit is released when the `AdmissionPermit` is dropped: on success,
//!   on error, on panic unwinding, and when the request future is cancelled.
//! - With `acquire_timeout` unset or zero a waiter blocks until a permit frees up.
//!   With `Some(limit)` it gives up after `limit` and the request is shed
//!   with `503 Service Unavailable`.
//!
//! This is a process-local gate. It gives no fairness or capacity bound
//! across instances.

use crate::config::AdmissionConfig;
use crate::error::ApiError;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Reasons an acquisition did not produce a permit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// No permit became free within the configured wait.
    #[error("no admission capacity within {}ms", .waited.as_millis())]
    Timeout { waited: Duration },

    /// The controller was closed during shutdown.
    #[error("admission controller closed")]
    Closed,
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AdmissionError::Timeout { waited } => waited.as_secs().max(1),
            AdmissionError::Closed => 1,
        };
        ApiError::service_unavailable(self.to_string())
            .with_retry_after(retry_after)
            .into_response()
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Bounded counting semaphore shared by every handler of a service instance.
#[derive(Debug)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Option<Duration>,
    admitted: AtomicU64,
    shed: AtomicU64,
}

/// A held admission slot. Dropping it frees the slot.
#[derive(Debug)]
#[must_use = "dropping the permit releases admission capacity immediately"]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionController {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            capacity: config.max_concurrent,
            acquire_timeout: config.wait_limit(),
            admitted: AtomicU64::new(0),
            shed: AtomicU64::new(0),
        }
    }

    /// Waits for a free permit, bounded by the configured timeout if any.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AdmissionError> {
        let acquire = Arc::clone(&self.semaphore).acquire_owned();

        let acquired = match self.acquire_timeout {
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(result) => result,
                Err(_) => {
                    self.shed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        capacity = self.capacity,
                        waited_ms = limit.as_millis() as u64,
                        "Admission wait timed out, shedding request"
                    );
                    return Err(AdmissionError::Timeout { waited: limit });
                }
            },
            None => acquire.await,
        };

        let permit = acquired.map_err(|_| AdmissionError::Closed)?;
        self.admitted.fetch_add(1, Ordering::Relaxed);
        Ok(AdmissionPermit { _permit: permit })
    }

    /// Takes a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        self.admitted.fetch_add(1, Ordering::Relaxed);
        Some(AdmissionPermit { _permit: permit })
    }

    /// Rejects all current and future waiters with `AdmissionError::Closed`.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    pub fn admitted_total(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    pub fn shed_total(&self) -> u64 {
        self.shed.load(Ordering::Relaxed)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "capacity": self.capacity,
            "in_flight": self.in_flight(),
            "admitted_total": self.admitted_total(),
            "shed_total": self.shed_total(),
        })
    }
}

// =============================================================================
// TOWER LAYER
// =============================================================================

/// Holds one admission permit around every request passing through it.
#[derive(Clone)]
pub struct AdmissionLayer {
    controller: Arc<AdmissionController>,
}

impl AdmissionLayer {
    pub fn new(controller: Arc<AdmissionController>) -> Self {
        Self { controller }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            controller: Arc::clone(&self.controller),
        }
    }
}

/// Admission service
#[derive(Clone)]
pub struct AdmissionService<S> {
    inner: S,
    controller: Arc<AdmissionController>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let controller = Arc::clone(&self.controller);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let permit = match controller.acquire().await {
                Ok(permit) => permit,
                Err(e) => return Ok(e.into_response()),
            };
            debug!(in_flight = controller.in_flight(), "Request admitted");

            let result = inner.call(req).await;
            drop(permit);
            result
        })
    }
}
