use std::sync::Arc;

use axum::Extension;
use modkit::api::{ApiError, ApiResult, JsonBytes, ListParams};
use modkit_errors::FieldError;
use tracing::info;

use crate::api::rest::dto::ItemsParams;
use crate::domain::{error::DomainError, service::Service};

/// List enabled items (filter / sort / paginate), optionally within one category group
pub async fn list_items(
    Extension(svc): Extension<Arc<Service>>,
    params: ItemsParams,
    ListParams(query): ListParams,
) -> ApiResult<JsonBytes> {
    info!(category_group = ?params.category_group, "fetching items");
    let body = svc
        .list_items_cached(params.category_group.as_deref(), &query)
        .await?;
    Ok(JsonBytes(body))
}

/// List all item categories grouped by category group
pub async fn list_categories(Extension(svc): Extension<Arc<Service>>) -> ApiResult<JsonBytes> {
    info!("fetching item categories");
    Ok(JsonBytes(svc.list_categories_cached().await?))
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidCategoryGroup { .. } => ApiError::invalid_input(e.to_string()),
            DomainError::Validation { field, error_type } => ApiError::Validation {
                fields: vec![FieldError::new(error_type, field)],
            },
            DomainError::Query(q) => ApiError::invalid_input(q.to_string()),
            DomainError::Database(_) | DomainError::Cache(_) => ApiError::fatal(e),
        }
    }
}
