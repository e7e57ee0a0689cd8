//! Flashcard domain.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
