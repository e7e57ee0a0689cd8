//! # Flashcards Service
//!
//! Flashcard set CRUD behind a cache-aside projection cache, plus the
//! two-phase commit participant routes.
//!
//! ## Consistency
//!
//! The relational store is the source of truth. Every update and delete
//! removes the cached projection of the affected set before responding, so
//! the next read after a write acknowledgment reloads from the store.
//!
//! ## Request Path
//!
//! ```text
//! CORS → Tracing → RateLimit → Admission → handler → CacheAside → store / cache
//! ```

pub mod adapters;
pub mod app;
pub mod config;
pub mod domain;
pub mod ports;
pub mod routes;
pub mod service;

pub use app::{build_app, build_app_with_time, FlashcardsApp};
pub use config::{CacheBackend, CacheConfig, FlashcardsConfig};
pub use domain::*;
pub use routes::AppState;
pub use service::CacheAside;
