use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::api::envelope::Envelope;

/// 200 OK + envelope
pub fn ok<T: Serialize>(value: T) -> Response {
    Envelope::data(value).into_response()
}

/// 201 Created + envelope
pub fn created<T: Serialize>(value: T) -> Response {
    Envelope::data(value).into_response_with(StatusCode::CREATED)
}

/// 204 No Content
pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
