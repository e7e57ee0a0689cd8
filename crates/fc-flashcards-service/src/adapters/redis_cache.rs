//! Redis-backed `ProjectionCache`.
//!
//! Connections go through a `ConnectionManager`, which reconnects on its
//! own. Retries are kept to one so a dead cache degrades reads to the store
//! quickly instead of stalling them.

use crate::domain::CacheError;
use crate::ports::ProjectionCache;
use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use std::time::Duration;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(100);

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

#[derive(Clone)]
pub struct RedisProjectionCache {
    connection: ConnectionManager,
}

impl RedisProjectionCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);
        let client = Client::open(redis_url).map_err(unavailable)?;

        let connection = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client.get_connection_manager_with_config(config),
        )
        .await
        .map_err(|_| {
            CacheError::Unavailable(format!(
                "no connection to {redis_url} within {}ms",
                CONNECT_TIMEOUT.as_millis()
            ))
        })?
        .map_err(unavailable)?;

        info!("Connected to Redis projection cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl ProjectionCache for RedisProjectionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(unavailable)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(unavailable)
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(unavailable)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
