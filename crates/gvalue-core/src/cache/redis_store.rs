//! Redis-backed cache store
//!
//! Uses a `ConnectionManager` so dropped connections are re-established
//! transparently. Every call is wrapped in a timeout; a slow Redis surfaces as
//! `CacheError::Timeout` instead of stalling the prediction path.

use super::CacheStore;
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Default upper bound on a single Redis call
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache store backed by Redis `SETEX`/`GET`/`DEL`
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
    timeout: Duration,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Connect to `url` (e.g. `redis://localhost:6379/0`)
    pub async fn connect(url: &str, timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid redis url: {}", e)))?;

        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(timeout))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        info!(url = %url, timeout_ms = timeout.as_millis() as u64, "Connected to Redis");
        Ok(Self { connection, timeout })
    }

    async fn bounded<T, F>(&self, op: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(|e| CacheError::Unavailable(e.to_string())),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = self.bounded(conn.get(key)).await?;
        debug!(key = %key, hit = value.is_some(), "Redis GET");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(key, value, seconds)).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let removed: u64 = self.bounded(conn.del(key)).await?;
        Ok(removed > 0)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
