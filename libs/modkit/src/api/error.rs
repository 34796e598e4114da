use axum::{
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use modkit_errors::{catalog, ErrDef, ErrorDetail, FieldError};
use tracing::{error, warn};

use crate::api::envelope::Envelope;

/// Unified error type at the API boundary.
///
/// Handlers return `ApiResult<T>` and use `?`; every variant renders as an
/// envelope with `data: null` and the catalog status/type.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Malformed client input (bad filter/sort token, duplicate email, ...).
    #[error("{message}")]
    InvalidInput {
        message: String,
        fields: Option<Vec<FieldError>>,
    },

    /// Request parameters that failed validation.
    #[error("validation failed")]
    Validation { fields: Vec<FieldError> },

    #[error("{0}")]
    NotFound(String),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("insufficient permission")]
    Forbidden,

    /// Store/cache transport failures and anything else unexpected.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// Generic Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            fields: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn fatal(e: impl Into<anyhow::Error>) -> Self {
        Self::Fatal(e.into())
    }

    pub fn def(&self) -> ErrDef {
        match self {
            ApiError::InvalidInput { .. } => catalog::INVALID_INPUT,
            ApiError::Validation { .. } => catalog::VALIDATION_ERROR,
            ApiError::NotFound(_) => catalog::RESOURCE_NOT_FOUND,
            ApiError::Unauthorized => catalog::INVALID_CREDENTIALS,
            ApiError::Forbidden => catalog::INSUFFICIENT_PERMISSION,
            ApiError::Fatal(_) => catalog::UNKNOWN_ERROR,
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        let def = self.def();
        match self {
            ApiError::InvalidInput { message, fields } => {
                let detail = def.to_detail(message.clone());
                match fields {
                    Some(f) => detail.with_fields(f.clone()),
                    None => detail,
                }
            }
            ApiError::Validation { fields } => def.default_detail().with_fields(fields.clone()),
            ApiError::NotFound(message) => def.to_detail(message.clone()),
            // never leak internals
            ApiError::Unauthorized | ApiError::Forbidden | ApiError::Fatal(_) => {
                def.default_detail()
            }
        }
    }
}

impl From<query_core::Error> for ApiError {
    fn from(e: query_core::Error) -> Self {
        let field = FieldError::new(e.error_type(), e.field());
        if e.is_validation() {
            ApiError::Validation {
                fields: vec![field],
            }
        } else {
            ApiError::InvalidInput {
                message: e.to_string(),
                fields: Some(vec![field]),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Fatal(e) => error!(error = ?e, "request failed"),
            other => warn!(error = %other, "request rejected"),
        }

        let def = self.def();
        let mut resp = Envelope::error(self.detail()).into_response_with(def.status_code());
        if matches!(self, ApiError::Unauthorized) {
            resp.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}

/// Router fallback for unknown paths.
pub async fn not_found_fallback(uri: Uri) -> Response {
    warn!(path = %uri.path(), "hit invalid endpoint");
    let def = catalog::RESOURCE_NOT_FOUND;
    Envelope::error(def.default_detail()).into_response_with(def.status_code())
}

/// Router fallback for a known path hit with the wrong method.
pub async fn method_not_allowed_fallback(method: Method, uri: Uri) -> Response {
    warn!(path = %uri.path(), %method, "request with invalid method");
    let def = catalog::METHOD_NOT_ALLOWED;
    Envelope::error(def.default_detail()).into_response_with(def.status_code())
}
