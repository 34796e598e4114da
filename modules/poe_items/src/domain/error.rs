use modkit_cache::CacheError;
use modkit_db::{DbError, QueryBuildError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// No category belongs to the requested group.
    #[error("Invalid category group.")]
    InvalidCategoryGroup { group: String },

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
    pub fn invalid_category_group(group: impl Into<String>) -> Self {
        Self::InvalidCategoryGroup { group: group.into() }
    }
}
