//! Uniform response body: `{"data": .., "error": .., "pagination"?: ..}`.

use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use modkit_errors::ErrorDetail;
use query_core::PaginationResult;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Success and failure bodies share one shape; `data` and `error` are never both set.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    data: Option<T>,
    key: Option<Cow<'static, str>>,
    error: Option<ErrorDetail>,
    pagination: Option<PaginationResult>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            key: None,
            error: None,
            pagination: None,
        }
    }

    /// Nest the payload as `{"<key>": data}`.
    pub fn with_key(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationResult) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn payload(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error_detail(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }
}

impl Envelope<()> {
    pub fn error(detail: ErrorDetail) -> Self {
        Self {
            data: None,
            key: None,
            error: Some(detail),
            pagination: None,
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match (&self.key, &self.data) {
            (Some(key), Some(data)) => {
                map.serialize_entry("data", &BTreeMap::from([(key.as_ref(), data)]))?
            }
            (_, data) => map.serialize_entry("data", data)?,
        }
        map.serialize_entry("error", &self.error)?;
        if let Some(pagination) = &self.pagination {
            map.serialize_entry("pagination", pagination)?;
        }
        map.end()
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// Render with an explicit status.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        match self.to_bytes() {
            Ok(body) => (status, JsonBytes(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response envelope");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        self.into_response_with(StatusCode::OK)
    }
}

/// Already-encoded JSON, e.g. an envelope read back from the cache. Sent as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBytes(pub Bytes);

impl From<Bytes> for JsonBytes {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl IntoResponse for JsonBytes {
    fn into_response(self) -> Response {
        (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            self.0,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_errors::catalog;
    use serde_json::json;

    #[test]
    fn bare_payload() {
        let v = serde_json::to_value(Envelope::data(json!({"name": "a"}))).unwrap();
        assert_eq!(v, json!({"data": {"name": "a"}, "error": null}));
    }

    #[test]
    fn keyed_payload_with_pagination() {
        let env = Envelope::data(vec![1, 2])
            .with_key("users")
            .with_pagination(PaginationResult {
                page: 1,
                per_page: 2,
                total_items: 5,
                total_pages: 3,
            });
        let v = serde_json::to_value(env).unwrap();
        assert_eq!(
            v,
            json!({
                "data": {"users": [1, 2]},
                "error": null,
                "pagination": {"page": 1, "per_page": 2, "total_items": 5, "total_pages": 3}
            })
        );
    }

    #[test]
    fn error_has_null_data() {
        let env = Envelope::error(catalog::RESOURCE_NOT_FOUND.to_detail("user not found"));
        let v = serde_json::to_value(env).unwrap();
        assert_eq!(v["data"], serde_json::Value::Null);
        assert_eq!(v["error"]["type"], "resource_not_found");
        assert_eq!(v["error"]["message"], "user not found");
    }

    #[tokio::test]
    async fn json_bytes_are_not_re_encoded() {
        let raw = Bytes::from_static(br#"{"data":[1],"error":null}"#);
        let resp = JsonBytes(raw.clone()).into_response();
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, raw);
    }
}
