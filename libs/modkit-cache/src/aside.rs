use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error};

use crate::key::CacheKey;
use crate::store::{CacheError, CacheStore};

/// Default expiry of single-record reads.
pub const ENTITY_TTL: Duration = Duration::from_secs(60 * 60);
/// Default expiry of filtered/paginated collection reads.
pub const COLLECTION_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlPolicy {
    pub entity: Duration,
    pub collection: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            entity: ENTITY_TTL,
            collection: COLLECTION_TTL,
        }
    }
}

/// Read-through access to a [`CacheStore`].
///
/// Concurrent misses on the same key are not coalesced; each caller computes and
/// writes its own result.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    policy: TtlPolicy,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, policy: TtlPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    /// Cached bytes for `key`, or the JSON encoding of `compute()` stored with `ttl`.
    ///
    /// A hit is returned verbatim. Errors from `compute` are returned as-is and
    /// nothing is cached.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Bytes, E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.store.get(key.as_str()).await {
            Ok(Some(bytes)) => {
                debug!(key = %key, "cache hit");
                return Ok(bytes);
            }
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(e) => {
                error!(op = "get", key = %key, error = %e, "cache read failed");
                return Err(e.into());
            }
        }

        let value = compute().await?;
        let bytes = Bytes::from(serde_json::to_vec(&value).map_err(CacheError::from)?);

        if let Err(e) = self.store.set(key.as_str(), bytes.clone(), Some(ttl)).await {
            error!(op = "set", key = %key, error = %e, "cache write failed");
            return Err(e.into());
        }
        debug!(key = %key, ttl_secs = ttl.as_secs(), "cached");
        Ok(bytes)
    }

    /// Entity read with the policy's entity TTL.
    pub async fn entity<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<Bytes, E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute(key, self.policy.entity, compute).await
    }

    /// Collection read with the policy's collection TTL.
    pub async fn collection<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<Bytes, E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute(key, self.policy.collection, compute).await
    }

    /// Reclaim expired entries from the backing store.
    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let purged = self.store.purge_expired().await.map_err(|e| {
            error!(op = "purge", error = %e, "cache purge failed");
            e
        })?;
        debug!(purged, "expired cache entries purged");
        Ok(purged)
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.store.delete(key.as_str()).await.map_err(|e| {
            error!(op = "delete", key = %key, error = %e, "cache invalidation failed");
            e
        })?;
        debug!(key = %key, "invalidated");
        Ok(())
    }
}
