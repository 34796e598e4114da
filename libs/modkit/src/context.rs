use std::sync::Arc;

use modkit_cache::CacheAside;
use modkit_db::RecordStore;
use query_core::page::PaginationCalculator;
use tokio_util::sync::CancellationToken;

/// Shared handles every module receives at startup.
#[derive(Clone)]
pub struct AppContext {
    store: Arc<dyn RecordStore>,
    cache: CacheAside,
    pagination: PaginationCalculator,
    cancellation_token: CancellationToken,
}

impl AppContext {
    pub fn new(store: Arc<dyn RecordStore>, cache: CacheAside) -> Self {
        Self {
            store,
            cache,
            pagination: PaginationCalculator::default(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationCalculator) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn cache(&self) -> &CacheAside {
        &self.cache
    }

    pub fn pagination(&self) -> PaginationCalculator {
        self.pagination
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }
}
