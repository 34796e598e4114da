use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::store::{CacheError, CacheStore};

/// Entry limit of [`MemoryCache::new`].
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process [`CacheStore`] holding at most `capacity` entries.
///
/// A full cache evicts its least recently used entry. Expired entries are dropped
/// on read and by [`CacheStore::purge_expired`].
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let Some((value, expired)) = entries
            .get(key)
            .map(|e| (e.value.clone(), e.is_expired(now)))
        else {
            return Ok(None);
        };

        if expired {
            entries.pop(key);
            return Ok(None);
        }
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .put(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().pop(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", Bytes::from_static(b"v"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        cache.set("forever", Bytes::from_static(b"x"), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("forever").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let cache = MemoryCache::new();
        cache
            .set("a", Bytes::new(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        cache
            .set("b", Bytes::new(), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unread_expired_keys_are_reclaimed() {
        let cache = MemoryCache::new();
        for i in 0..1000 {
            cache
                .set(&format!("items:list:{i:016x}"), Bytes::from_static(b"{}"), Some(Duration::from_secs(300)))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.purge_expired().await.unwrap(), 1000);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn capacity_bounds_distinct_keys() {
        let cache = MemoryCache::with_capacity(3);
        for key in ["a", "b", "c"] {
            cache.set(key, Bytes::from(key), None).await.unwrap();
        }
        // touch "a" so "b" is the least recently used
        assert!(cache.get("a").await.unwrap().is_some());
        cache.set("d", Bytes::from_static(b"d"), None).await.unwrap();

        assert_eq!(cache.len(), 3);
        assert!(cache.get("b").await.unwrap().is_none());
        for key in ["a", "c", "d"] {
            assert!(cache.get(key).await.unwrap().is_some(), "{key} evicted");
        }
        assert_eq!(MemoryCache::with_capacity(0).capacity(), 1);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let cache = MemoryCache::new();
        cache.set("k", Bytes::from_static(b"v"), None).await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(cache.is_empty());
        // deleting an absent key is not an error
        cache.delete("k").await.unwrap();
    }
}
