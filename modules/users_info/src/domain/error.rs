use modkit_cache::CacheError;
use modkit_db::{DbError, QueryBuildError};
use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("user not found")]
    UserNotFound { id: String },

    #[error("email associated with another account")]
    EmailAlreadyExists { email: String },

    /// Input failed a field rule; `error_type` is the machine-readable reason.
    #[error("Validation failed: {field}: {error_type}")]
    Validation {
        field: &'static str,
        error_type: &'static str,
    },

    #[error(transparent)]
    Query(#[from] QueryBuildError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl DomainError {
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::UserNotFound { id: id.into() }
    }

    pub fn validation(field: &'static str, error_type: &'static str) -> Self {
        Self::Validation { field, error_type }
    }
}
