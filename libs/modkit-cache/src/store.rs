use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache transport error: {0}")]
    Transport(String),

    #[error("cache payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Byte-oriented key/value store: `GET key`, `SET key value EX seconds`, `DEL key`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// `ttl = None` stores without expiry.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Drop entries whose TTL has elapsed; returns how many were dropped.
    /// Stores that expire entries themselves keep the default.
    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}
