//! Participant domain.

pub mod config;
pub mod entities;
pub mod errors;
pub mod service;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use service::*;
