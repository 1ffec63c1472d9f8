//! Cache capability consumed by the prediction service
//!
//! This module provides:
//! - The `CacheStore` trait (get/set/delete by string key with TTL)
//! - An in-memory store backed by `DashMap`
//! - A Redis store (feature `cache-redis`) with bounded call latency
//! - A no-op store for running without a cache

mod memory;
#[cfg(feature = "cache-redis")]
mod redis_store;

pub use memory::{InMemoryCacheStore, DEFAULT_SWEEP_INTERVAL};
#[cfg(feature = "cache-redis")]
pub use redis_store::{RedisCacheStore, DEFAULT_CACHE_TIMEOUT};

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Lifetime of a cached prediction (5 minutes)
pub const PREDICTION_TTL: Duration = Duration::from_secs(300);

/// Prefix of every prediction cache key
pub const CACHE_KEY_PREFIX: &str = "g_value";

/// Cache key for a worker-order pairing: `g_value:{worker_id}:{order_id}`
pub fn prediction_cache_key(worker_id: &str, order_id: &str) -> String {
    format!("{}:{}:{}", CACHE_KEY_PREFIX, worker_id, order_id)
}

/// Key/value store with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live value; expired entries are absent
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove a value, returning whether one was present
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Always-miss, always-succeed store
#[derive(Debug, Clone, Default)]
pub struct NoOpCacheStore;

#[async_trait]
impl CacheStore for NoOpCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
