use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use modkit_cache::{CacheAside, CacheError, CacheKey, CacheStore, MemoryCache, TtlPolicy};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("compute failed")]
    Compute,
}

fn aside() -> (CacheAside, MemoryCache) {
    let cache = MemoryCache::new();
    (CacheAside::new(Arc::new(cache.clone()), TtlPolicy::default()), cache)
}

#[tokio::test(start_paused = true)]
async fn second_read_is_served_from_cache() {
    let (aside, _) = aside();
    let key = CacheKey::collection("items", "abc");
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    let compute = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, TestError>(json!({"data": [1, 2, 3], "error": null}))
    };

    let first = aside.collection(&key, compute).await.unwrap();
    let second = aside.collection(&key, compute).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn recomputes_after_ttl() {
    let (aside, _) = aside();
    let key = CacheKey::entity("users", "u1");
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let compute = move || async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, TestError>(json!({ "n": n }))
    };

    aside
        .get_or_compute(&key, Duration::from_secs(10), compute)
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(11)).await;
    let again = aside
        .get_or_compute(&key, Duration::from_secs(10), compute)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(again, Bytes::from_static(br#"{"n":1}"#));
}

#[tokio::test]
async fn invalidate_forces_a_miss() {
    let (aside, cache) = aside();
    let key = CacheKey::entity("users", "u1");

    aside
        .entity(&key, || async { Ok::<_, TestError>("old") })
        .await
        .unwrap();
    aside.invalidate(&key).await.unwrap();
    assert!(cache.get(key.as_str()).await.unwrap().is_none());

    let fresh = aside
        .entity(&key, || async { Ok::<_, TestError>("new") })
        .await
        .unwrap();
    assert_eq!(fresh, Bytes::from_static(br#""new""#));
}

#[tokio::test]
async fn compute_error_is_not_cached() {
    let (aside, cache) = aside();
    let key = CacheKey::entity("users", "missing");

    let err = aside
        .entity(&key, || async { Err::<(), _>(TestError::Compute) })
        .await
        .unwrap_err();
    assert!(matches!(err, TestError::Compute));
    assert!(cache.is_empty());
}

struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::Transport("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Transport("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Transport("connection refused".into()))
    }
}

#[tokio::test]
async fn cache_outage_propagates_instead_of_falling_back() {
    let aside = CacheAside::new(Arc::new(BrokenCache), TtlPolicy::default());
    let key = CacheKey::entity("users", "u1");
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    let err = aside
        .entity(&key, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>(1)
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TestError::Cache(CacheError::Transport(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(aside.invalidate(&key).await.is_err());
}
