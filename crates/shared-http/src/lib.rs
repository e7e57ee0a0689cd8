//! # Shared HTTP Stack
//!
//! Everything a service instance wraps around its handlers.
//!
//! ## Layer Order
//!
//! ```text
//! Request → CORS → Tracing → RateLimit (per IP) → Admission (per instance) → Handler
//! ```
//!
//! The rate limiter rejects by client before admission is attempted, so a
//! single noisy client cannot occupy admission capacity with requests it is
//! not allowed to make.
//!
//! ## Admission
//!
//! `AdmissionController` is a bounded counting semaphore created once per
//! service instance and injected into the router. Every request holds one
//! permit for the full duration of its handler. Permits are RAII guards, so
//! they are returned on every exit path.

pub mod admission;
pub mod config;
pub mod cors;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod tracing;

pub use admission::{AdmissionController, AdmissionError, AdmissionLayer, AdmissionPermit};
pub use config::{
    env_override, env_override_duration, load_json_file, AdmissionConfig, ConfigError, CorsConfig,
    HttpConfig, RateLimitConfig,
};
pub use cors::create_cors_layer;
pub use error::{ApiError, ApiResult};
pub use identity::{Authenticated, IdentityState};
pub use logging::init_tracing;
pub use metrics::ServiceMetrics;
pub use rate_limit::{RateLimitLayer, RateLimitState};
pub use server::{serve, shutdown_signal, MiddlewareStack};
pub use self::tracing::TracingLayer;
