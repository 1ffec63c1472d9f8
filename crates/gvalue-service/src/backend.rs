//! Cache backend selection

use crate::config::{CacheBackend, ServiceConfig};
use gvalue_core::{
    cache::{CacheStore, InMemoryCacheStore, NoOpCacheStore, RedisCacheStore, DEFAULT_SWEEP_INTERVAL},
    health::{components, HealthRegistry},
};
use std::sync::Arc;
use tracing::{error, warn};

/// Build the configured cache store.
///
/// An unreachable Redis never stops the service: it runs without a cache.
/// The cache component is reported unhealthy when `cache_required` is set,
/// which fails readiness, and degraded otherwise.
pub async fn connect_cache(config: &ServiceConfig, health: &HealthRegistry) -> Arc<dyn CacheStore> {
    match config.cache_backend {
        CacheBackend::Memory => {
            let store = Arc::new(InMemoryCacheStore::new());
            store.spawn_sweeper(DEFAULT_SWEEP_INTERVAL);
            store
        }
        CacheBackend::None => Arc::new(NoOpCacheStore),
        CacheBackend::Redis => {
            match RedisCacheStore::connect(&config.redis_url, config.cache_timeout()).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    let message = format!("redis unavailable: {}", e);
                    if config.cache_required {
                        error!(url = %config.redis_url, error = %e, "Required Redis cache unavailable");
                        health.set_unhealthy(components::CACHE, message).await;
                    } else {
                        warn!(url = %config.redis_url, error = %e, "Redis unavailable, running without cache");
                        health.set_degraded(components::CACHE, message).await;
                    }
                    Arc::new(NoOpCacheStore)
                }
            }
        }
    }
}
