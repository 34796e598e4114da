use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use modkit::api::ApiError;
use modkit_errors::FieldError;

const CATEGORY_GROUP: &str = "category_group";

/// Item-listing parameters beyond the shared list query.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ItemsParams {
    pub category_group: Option<String>,
}

impl ItemsParams {
    /// Reads `category_group` from a raw query string; the key may appear once.
    pub fn from_query(raw: &str) -> Result<Self, ApiError> {
        let mut out = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key == CATEGORY_GROUP && out.category_group.replace(value.into_owned()).is_some() {
                return Err(ApiError::Validation {
                    fields: vec![FieldError::new("duplicate_parameter", CATEGORY_GROUP)],
                });
            }
        }
        Ok(out)
    }
}

impl<S> FromRequestParts<S> for ItemsParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let parsed = Self::from_query(parts.uri.query().unwrap_or(""));
        async move { parsed }
    }
}
