use thiserror::Error;

/// Why a single token was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Token did not split into `field:op:value`.
    WrongPartCount,
    EmptyField,
    UnknownOperation,
    ValueLength,
    /// Sort token did not start with `-` or a letter.
    BadSortPrefix,
    /// Parameter was present but carried no tokens.
    EmptyList,
}

impl Rejection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Rejection::WrongPartCount => "expected field:operation:value",
            Rejection::EmptyField => "field name is empty",
            Rejection::UnknownOperation => "unrecognized operation",
            Rejection::ValueLength => "value length must be between 1 and 200",
            Rejection::BadSortPrefix => "sort field must start with '-' or a letter",
            Rejection::EmptyList => "no entries supplied",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid list-query input. Always a client error, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid filter '{token}': {reason}")]
    InvalidFilter { token: String, reason: Rejection },

    #[error("invalid sort '{token}': {reason}")]
    InvalidSort { token: String, reason: Rejection },

    #[error("invalid {field}: {message}")]
    InvalidPagination {
        field: &'static str,
        message: String,
    },
}

impl Error {
    /// Query parameter the error refers to.
    pub fn field(&self) -> &str {
        match self {
            Error::InvalidFilter { .. } => "filter",
            Error::InvalidSort { .. } => "sort",
            Error::InvalidPagination { field, .. } => field,
        }
    }

    /// Machine-readable error type used in field-level error details.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidFilter { .. } => "invalid_filter",
            Error::InvalidSort { .. } => "invalid_sort",
            Error::InvalidPagination { .. } => "out_of_range",
        }
    }

    /// Pagination problems are parameter validation failures; token problems are bad input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidPagination { .. })
    }
}
