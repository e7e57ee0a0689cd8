//! Adapters: persistence, background sweep, HTTP.

pub mod http;
pub mod sqlite;
pub mod sweeper;
