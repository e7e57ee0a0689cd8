//! Store and cache adapters.

pub mod memory_cache;
pub mod redis_cache;
pub mod sqlite;

pub use memory_cache::MemoryProjectionCache;
pub use redis_cache::RedisProjectionCache;
pub use sqlite::SqliteFlashcardStore;
