//! Identity domain.

pub mod entities;
pub mod errors;
pub mod password;

pub use entities::*;
pub use errors::*;
pub use password::*;
