//! # Auth Service
//!
//! User registration and login. A successful login returns an HMAC-signed
//! access token that the flashcards service verifies with the same secret.
//! Also mounts the two-phase commit participant routes over its own
//! `transactions` table.
//!
//! ## Request Path
//!
//! ```text
//! CORS → Tracing → RateLimit → Admission → handler → AccountService → users
//! ```

pub mod adapters;
pub mod app;
pub mod config;
pub mod domain;
pub mod ports;
pub mod routes;
pub mod service;

pub use app::{build_app, build_app_with_time, AuthApp};
pub use config::AuthConfig;
pub use domain::*;
pub use routes::AppState;
pub use service::{AccountService, Session};
