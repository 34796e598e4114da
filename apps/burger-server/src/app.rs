use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{Extension, Router};
use modkit::api::{method_not_allowed_fallback, not_found_fallback};
use modkit::auth::{ClaimsVerifier, JwtVerifier};
use modkit::AppContext;
use modkit_cache::{CacheAside, MemoryCache, TtlPolicy};
use modkit_db::MemoryStore;
use query_core::PaginationCalculator;
use runtime::AppConfig;
use tokio_util::sync::CancellationToken;

use crate::middleware;

/// Store, cache and pagination policy shared by every module.
pub fn build_context(config: &AppConfig, cancel: CancellationToken) -> AppContext {
    let store =
        MemoryStore::new().with_unique_index(users_info::infra::storage::entity::COLLECTION, "email");
    let ttl = TtlPolicy {
        entity: Duration::from_secs(config.cache.entity_ttl_secs),
        collection: Duration::from_secs(config.cache.collection_ttl_secs),
    };
    let cache = CacheAside::new(
        Arc::new(MemoryCache::with_capacity(config.cache.max_entries)),
        ttl,
    );

    AppContext::new(Arc::new(store), cache)
        .with_pagination(PaginationCalculator::new(
            config.pagination.items_per_page,
            config.pagination.maximum_items_per_page,
        ))
        .with_cancellation_token(cancel)
}

/// `modules.poe_items.seed_file`, resolved against the home directory.
pub fn catalog_seed_file(config: &AppConfig) -> Option<PathBuf> {
    let raw = config.modules.get("poe_items")?.get("seed_file")?.as_str()?;
    let path = PathBuf::from(raw);
    Some(if path.is_relative() {
        config.home_dir().join(path)
    } else {
        path
    })
}

pub async fn seed_catalog(ctx: &AppContext, config: &AppConfig) -> Result<()> {
    match catalog_seed_file(config) {
        Some(path) => {
            poe_items::infra::storage::seed::load_file(ctx.store().as_ref(), &path).await?;
        }
        None => tracing::info!("no catalog seed file configured; item catalog starts empty"),
    }
    Ok(())
}

/// HTTP surface: module routes, envelope fallbacks and the middleware stack.
pub fn build_router(ctx: &AppContext, config: &AppConfig) -> Router {
    let verifier: Option<Arc<dyn ClaimsVerifier>> = match config.auth.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => {
            Some(Arc::new(JwtVerifier::hs256(secret.as_bytes())) as Arc<dyn ClaimsVerifier>)
        }
        _ => {
            tracing::warn!("auth.jwt_secret is not set; /poe routes are served without authentication");
            None
        }
    };

    let mut router = Router::new();
    router = users_info::router(ctx, router);
    router = poe_items::router(ctx, verifier, router);
    router = router
        .fallback(not_found_fallback)
        .method_not_allowed_fallback(method_not_allowed_fallback)
        .layer(Extension(ctx.pagination()));

    middleware::apply(router, config.server.timeout_sec)
}
