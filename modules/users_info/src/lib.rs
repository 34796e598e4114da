//! User accounts: create, list, get, update and delete.
//!
//! Reads go through the response cache; writes run in a store transaction and
//! invalidate the cached record before touching the store.

pub mod api;
pub mod contract;
pub mod domain;
pub mod infra;

use std::sync::Arc;

use axum::Router;
use modkit::AppContext;

use crate::domain::service::Service;

/// Build the module's service from the application context.
pub fn service(ctx: &AppContext) -> Arc<Service> {
    Arc::new(Service::new(ctx.store(), ctx.cache().clone()))
}

/// The module's routes, mounted on `router`.
pub fn router(ctx: &AppContext, router: Router) -> Router {
    api::rest::routes::register_routes(router, service(ctx))
}
