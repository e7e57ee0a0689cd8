//! # Shared Types Crate
//!
//! Types shared by the auth and flashcards services.
//!
//! ## Contents
//!
//! - `entities`: transaction ids and status, caller identity
//! - `errors`: validation and token errors
//! - `security`: HMAC-SHA256 access tokens and the `IdentityVerifier` port
//! - `time`: injectable time source
//!
//! ## Design Principles
//!
//! - **No shared runtime state**: everything here is a value type or a pure
//!   function of its inputs plus a secret.
//! - **Identity is opaque**: handlers receive a `SubjectId` from an
//!   `IdentityVerifier` and never look inside the token themselves.

pub mod entities;
pub mod errors;
pub mod security;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use security::*;
pub use time::*;
