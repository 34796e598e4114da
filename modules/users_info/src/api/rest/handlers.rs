use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    response::{IntoResponse, Response},
    Extension, Json,
};
use modkit::api::{created, no_content, ApiError, ApiResult, JsonBytes, ListParams};
use modkit_errors::FieldError;
use tracing::{info, warn};

use crate::api::rest::dto::{CreateUserReq, CreatedUserDto, UpdateUserReq};
use crate::domain::{error::DomainError, service::Service};

/// List users (filter / sort / paginate)
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
    ListParams(query): ListParams,
) -> ApiResult<JsonBytes> {
    info!("fetching users");
    Ok(JsonBytes(svc.list_users_cached(&query).await?))
}

/// Get a specific user by ID
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<JsonBytes> {
    info!("fetching user with id: {}", id);
    Ok(JsonBytes(svc.get_user_cached(&id).await?))
}

/// Create a new user
pub async fn create_user(
    Extension(svc): Extension<Arc<Service>>,
    body: Result<Json<CreateUserReq>, JsonRejection>,
) -> ApiResult<Response> {
    info!("creating new user");
    let Json(req) = body.map_err(body_error)?;
    let user_id = svc.create_user(req.into()).await?;
    Ok(created(CreatedUserDto { user_id }))
}

/// Update an existing user
pub async fn update_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserReq>, JsonRejection>,
) -> ApiResult<Response> {
    info!("updating user with id: {}", id);
    let Json(req) = body.map_err(body_error)?;
    svc.update_user(&id, req.into()).await?;
    Ok(no_content().into_response())
}

/// Delete a user by ID
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    info!("deleting user with id: {}", id);
    svc.delete_user(&id).await?;
    Ok(no_content().into_response())
}

fn body_error(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "rejected request body");
    ApiError::Validation {
        fields: vec![FieldError::new("invalid_body", "body")],
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UserNotFound { .. } => ApiError::not_found("user not found"),
            DomainError::EmailAlreadyExists { .. } => {
                ApiError::invalid_input("email associated with another account")
            }
            DomainError::Validation { field, error_type } => ApiError::Validation {
                fields: vec![FieldError::new(error_type, field)],
            },
            DomainError::Query(q) => ApiError::invalid_input(q.to_string()),
            DomainError::Database(_) | DomainError::Cache(_) => ApiError::fatal(e),
        }
    }
}
