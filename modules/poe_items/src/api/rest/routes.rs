use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Router};
use modkit::auth::{require_bearer, ClaimsVerifier};

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// `/poe/items` and `/poe/categories`, behind the bearer gate when a verifier is given.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    verifier: Option<Arc<dyn ClaimsVerifier>>,
) -> Router {
    let mut poe = Router::new()
        .route("/poe/items", get(handlers::list_items))
        .route("/poe/categories", get(handlers::list_categories))
        .layer(Extension(service));

    if let Some(verifier) = verifier {
        poe = poe.route_layer(middleware::from_fn_with_state(verifier, require_bearer));
    }

    router.merge(poe)
}
