//! Static error catalog and the error body rendered inside response envelopes.
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Static error definition from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    /// Machine-readable `error.type` value.
    pub error_type: &'static str,
    /// Message used when the occurrence carries none of its own.
    pub message: &'static str,
}

impl ErrDef {
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Error body with a custom message.
    #[inline]
    pub fn to_detail(&self, message: impl Into<String>) -> ErrorDetail {
        ErrorDetail {
            error_type: self.error_type.to_string(),
            message: message.into(),
            fields: None,
        }
    }

    /// Error body with the catalog message.
    #[inline]
    pub fn default_detail(&self) -> ErrorDetail {
        self.to_detail(self.message)
    }
}

/// `error` member of the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub fields: Option<Vec<FieldError>>,
}

impl ErrorDetail {
    pub fn with_fields(mut self, fields: Vec<FieldError>) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// One offending input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub error_type: String,
    pub field: String,
}

impl FieldError {
    pub fn new(error_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            field: field.into(),
        }
    }
}

pub mod catalog {
    use super::ErrDef;

    pub const INVALID_INPUT: ErrDef = ErrDef {
        status: 400,
        error_type: "invalid_input",
        message: "Invalid input.",
    };

    pub const INVALID_CREDENTIALS: ErrDef = ErrDef {
        status: 401,
        error_type: "invalid_credentials",
        message: "Could not validate credentials.",
    };

    pub const INSUFFICIENT_PERMISSION: ErrDef = ErrDef {
        status: 403,
        error_type: "insufficient_permission",
        message: "Insufficient permission to access this resource.",
    };

    pub const RESOURCE_NOT_FOUND: ErrDef = ErrDef {
        status: 404,
        error_type: "resource_not_found",
        message: "Requested resource not found.",
    };

    pub const METHOD_NOT_ALLOWED: ErrDef = ErrDef {
        status: 405,
        error_type: "method_not_allowed",
        message: "Method not allowed.",
    };

    pub const VALIDATION_ERROR: ErrDef = ErrDef {
        status: 422,
        error_type: "validation_error",
        message: "Input failed validation.",
    };

    pub const UNKNOWN_ERROR: ErrDef = ErrDef {
        status: 500,
        error_type: "unknown_error",
        message: "An unknown error occured. Please try again later.",
    };
}
