//! Cache store seam and an in-memory adapter
//!
//! The cached executor only needs `get` and `set`. Real deployments plug in a
//! shared store (Redis, memcached, ...) behind [`CacheStore`]; [`MemoryStore`]
//! covers tests and single-process use. It honours TTLs and nothing else:
//! no size limit, no eviction, no persistence.

use crate::cache::{
    entry::CacheEntry,
    types::{CacheKey, CacheValue},
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Key-value store with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `Ok(None)` is a miss
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: &CacheValue, ttl: Duration) -> Result<()>;
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }
}

/// TTL-honouring in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a live entry exists for `key`
    pub async fn contains_key(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).map(|e| !e.is_expired()).unwrap_or(false)
    }

    /// Remove a specific entry
    pub async fn remove(&self, key: &str) -> Option<CacheValue> {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(key).map(|entry| entry.value);
        if removed.is_some() {
            debug!("Removed cache entry: {}", key);
        }
        removed
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        debug!("Cleared {} entries from memory store", count);
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }

    /// Remaining lifetime of a live entry
    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries.get(key).and_then(CacheEntry::time_until_expiration)
    }

    /// Number of stored entries, expired ones included until touched
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it so it does not linger
        let mut entries = self.entries.write().await;
        if entries.get(key).map(CacheEntry::is_expired).unwrap_or(false) {
            debug!("Cache entry expired: {}", key);
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value.clone(), ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let store = MemoryStore::new();
        store
            .set("users:1", &json!({"_id": "1"}), Duration::from_secs(60))
            .await
            .unwrap();

        let value = store.get("users:1").await.unwrap();
        assert_eq!(value, Some(json!({"_id": "1"})));
        assert!(store.contains_key("users:1").await);
    }

    #[tokio::test]
    async fn test_miss() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = MemoryStore::new();
        store
            .set("key1", &json!("value1"), Duration::from_millis(50))
            .await
            .unwrap();

        assert!(store.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.get("key1").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_overwrite_resets_ttl() {
        let store = MemoryStore::new();
        store.set("k", &json!(1), Duration::from_secs(1)).await.unwrap();
        store.set("k", &json!(2), Duration::from_secs(300)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
        assert!(store.ttl_of("k").await.unwrap() > Duration::from_secs(200));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = MemoryStore::new();
        store.set("a", &json!(1), Duration::from_secs(60)).await.unwrap();
        store.set("b", &json!(2), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.remove("a").await, Some(json!(1)));
        assert_eq!(store.remove("a").await, None);

        store.clear().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::new();
        store.set("short", &json!(1), Duration::from_millis(30)).await.unwrap();
        store.set("long", &json!(2), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.contains_key("long").await);
    }

    #[tokio::test]
    async fn test_arc_store_delegates() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        store.set("k", &json!([1, 2]), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));
    }
}
