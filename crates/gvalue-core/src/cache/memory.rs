//! In-process cache store
//!
//! Expiry is measured on `tokio::time::Instant`, so tests can drive it with a
//! paused runtime clock.

use super::CacheStore;
use crate::error::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::debug;

/// Default period of the background expiry sweep
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Longest lifetime an entry can be given; larger TTLs are clamped to it
const MAX_TTL: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent in-memory store with lazy expiry
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    /// Purge expired entries every `period` until the store is dropped.
    ///
    /// Reads only evict the key they touch, so entries that are never read
    /// again stay resident until a sweep removes them.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(live) = store.upgrade() else {
                    debug!("Cache store dropped, stopping expiry sweep");
                    break;
                };
                let removed = live.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = live.len(), "Expired cache entries purged");
                }
            }
        })
    }
}

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_TTL))
        .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60))
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: expiry(Instant::now(), ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, entry)| !entry.is_expired(now))
            .unwrap_or(false))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PREDICTION_TTL;

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get() {
        let store = InMemoryCacheStore::new();
        store.set("g_value:w1:o1", "{}", PREDICTION_TTL).await.unwrap();
        assert_eq!(store.get("g_value:w1:o1").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.get("g_value:w1:o2").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = InMemoryCacheStore::new();
        store.set("k", "v", PREDICTION_TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty(), "expired entry removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_refreshes_ttl() {
        let store = InMemoryCacheStore::new();
        store.set("k", "old", PREDICTION_TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        store.set("k", "new", PREDICTION_TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete() {
        let store = InMemoryCacheStore::new();
        store.set("k", "v", PREDICTION_TTL).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = InMemoryCacheStore::new();
        store.set("short", "v", Duration::from_secs(10)).await.unwrap();
        store.set("long", "v", PREDICTION_TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let store = InMemoryCacheStore::new();
        store.set("forever", "v", Duration::MAX).await.unwrap();
        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
        assert_eq!(store.get("forever").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_unread_entries() {
        let store = Arc::new(InMemoryCacheStore::new());
        for i in 0..1000 {
            let key = format!("g_value:w{}:o{}", i, i);
            store.set(&key, "{}", PREDICTION_TTL).await.unwrap();
        }
        store.set("long", "v", Duration::from_secs(3600)).await.unwrap();
        let handle = store.spawn_sweeper(DEFAULT_SWEEP_INTERVAL);

        // One full TTL plus one sweep period, with no reads in between
        tokio::time::sleep(PREDICTION_TTL + DEFAULT_SWEEP_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("v"));

        drop(store);
        tokio::time::sleep(DEFAULT_SWEEP_INTERVAL).await;
        assert!(handle.await.is_ok(), "sweeper exits once the store is dropped");
    }
}
