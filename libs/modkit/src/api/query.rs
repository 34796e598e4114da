//! List-query extraction: `page`, `per_page`, repeatable `filter` and `sort`.

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use modkit_errors::FieldError;
use query_core::{parse_filters, parse_sorts, ListQuery, PaginationCalculator};

use crate::api::error::ApiError;

#[derive(Debug, Default)]
struct RawListParams {
    filter: Option<Vec<String>>,
    sort: Option<Vec<String>>,
    page: Option<String>,
    per_page: Option<String>,
}

impl RawListParams {
    fn from_query(raw: &str) -> Self {
        let mut out = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "filter" => out.filter.get_or_insert_with(Vec::new).push(value.into_owned()),
                "sort" => out.sort.get_or_insert_with(Vec::new).push(value.into_owned()),
                "page" => out.page = Some(value.into_owned()),
                "per_page" => out.per_page = Some(value.into_owned()),
                _ => {}
            }
        }
        out
    }
}

fn parse_int(field: &'static str, raw: Option<&str>) -> Result<Option<u64>, FieldError> {
    raw.map(|v| v.trim().parse::<u64>())
        .transpose()
        .map_err(|_| FieldError::new("expected_int", field))
}

/// Parse a raw query string into a validated [`ListQuery`].
///
/// Pagination problems are reported together as a validation error; filter/sort
/// tokens are checked afterwards and fail as invalid input. Nothing is partially accepted.
pub fn parse_list_query(raw: &str, calculator: &PaginationCalculator) -> Result<ListQuery, ApiError> {
    let params = RawListParams::from_query(raw);

    let page = parse_int("page", params.page.as_deref());
    let per_page = parse_int("per_page", params.per_page.as_deref());
    let (page, per_page) = match (page, per_page) {
        (Ok(p), Ok(pp)) => (p, pp),
        (p, pp) => {
            let fields = [p.err(), pp.err()].into_iter().flatten().collect();
            return Err(ApiError::Validation { fields });
        }
    };
    let page = calculator.request(page, per_page)?;

    let filters = parse_filters(params.filter.as_deref())?;
    let sorts = parse_sorts(params.sort.as_deref())?;

    Ok(ListQuery {
        filters,
        sorts,
        page,
    })
}

/// Axum extractor for list endpoints.
///
/// The page-size policy is read from a `PaginationCalculator` request extension,
/// falling back to the defaults.
///
/// Usage in handlers:
///   async fn list_items(ListParams(query): ListParams, /* ... */) { /* use `query` */ }
#[derive(Debug, Clone)]
pub struct ListParams(pub ListQuery);

impl ListParams {
    #[inline]
    pub fn into_inner(self) -> ListQuery {
        self.0
    }
}

impl Deref for ListParams {
    type Target = ListQuery;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ListParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let calculator = parts
            .extensions
            .get::<PaginationCalculator>()
            .copied()
            .unwrap_or_default();
        let result = parse_list_query(parts.uri.query().unwrap_or_default(), &calculator);
        async move { result.map(ListParams) }
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod query_tests;
