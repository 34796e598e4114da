//! Path of Exile item catalog: item listing and categories grouped by group.
//!
//! Both reads are served from the collection cache. The catalog is populated by
//! [`infra::storage::seed`].

pub mod api;
pub mod contract;
pub mod domain;
pub mod infra;

use std::sync::Arc;

use axum::Router;
use modkit::auth::ClaimsVerifier;
use modkit::AppContext;

use crate::domain::service::Service;

pub fn service(ctx: &AppContext) -> Arc<Service> {
    Arc::new(Service::new(ctx.store(), ctx.cache().clone()))
}

/// The module's routes, mounted on `router`. With a verifier, every route
/// requires a bearer token.
pub fn router(
    ctx: &AppContext,
    verifier: Option<Arc<dyn ClaimsVerifier>>,
    router: Router,
) -> Router {
    api::rest::routes::register_routes(router, service(ctx), verifier)
}
