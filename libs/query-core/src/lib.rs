//! Transport-agnostic list-query model.
//!
//! Raw `filter` / `sort` query-string tokens are parsed here into typed clauses.
//! Translating clauses into store queries belongs to `modkit-db`.

pub mod ast {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Separator between path segments of an embedded-document field.
    pub const PATH_SEPARATOR: char = '.';

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FilterOp {
        Eq,
        Ne,
        Gt,
        Gte,
        Lt,
        Lte,
        Like,
    }

    impl FilterOp {
        pub const ALL: [FilterOp; 7] = [
            FilterOp::Eq,
            FilterOp::Ne,
            FilterOp::Gt,
            FilterOp::Gte,
            FilterOp::Lt,
            FilterOp::Lte,
            FilterOp::Like,
        ];

        /// Token used for this operation inside a `field:op:value` filter.
        pub const fn as_token(self) -> &'static str {
            match self {
                FilterOp::Eq => "=",
                FilterOp::Ne => "!=",
                FilterOp::Gt => ">",
                FilterOp::Gte => ">=",
                FilterOp::Lt => "<",
                FilterOp::Lte => "<=",
                FilterOp::Like => "like",
            }
        }

        pub fn from_token(token: &str) -> Option<Self> {
            Some(match token.to_ascii_lowercase().as_str() {
                "=" => FilterOp::Eq,
                "!=" => FilterOp::Ne,
                ">" => FilterOp::Gt,
                ">=" => FilterOp::Gte,
                "<" => FilterOp::Lt,
                "<=" => FilterOp::Lte,
                "like" => FilterOp::Like,
                _ => return None,
            })
        }
    }

    impl fmt::Display for FilterOp {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_token())
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FilterClause {
        /// Always lower-cased.
        pub field: String,
        pub op: FilterOp,
        pub value: String,
    }

    impl FilterClause {
        /// True when the field addresses a value inside an embedded document.
        pub fn is_nested(&self) -> bool {
            self.field.contains(PATH_SEPARATOR)
        }

        /// Render back to the `field:op:value` token form.
        pub fn to_token(&self) -> String {
            format!("{}:{}:{}", self.field, self.op, self.value)
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SortDir {
        #[default]
        Asc,
        Desc,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SortClause {
        /// Always lower-cased.
        pub field: String,
        pub dir: SortDir,
    }

    impl SortClause {
        pub fn is_nested(&self) -> bool {
            self.field.contains(PATH_SEPARATOR)
        }

        pub fn to_token(&self) -> String {
            match self.dir {
                SortDir::Asc => self.field.clone(),
                SortDir::Desc => format!("-{}", self.field),
            }
        }
    }
}

mod error;
pub mod fingerprint;
pub mod page;
pub mod parse;

pub use ast::{FilterClause, FilterOp, SortClause, SortDir};
pub use error::{Error, Rejection};
pub use page::{
    PaginationCalculator, PaginationRequest, PaginationResult, ITEMS_PER_PAGE,
    MAXIMUM_ITEMS_PER_PAGE,
};
pub use parse::{parse_filters, parse_sorts, MAX_FILTER_VALUE_LEN, MIN_FILTER_VALUE_LEN};

/// Everything a list endpoint needs to know about one request.
///
/// `None` for filters/sorts means the parameter was absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Option<Vec<FilterClause>>,
    pub sorts: Option<Vec<SortClause>>,
    pub page: PaginationRequest,
}

impl ListQuery {
    pub fn new(page: PaginationRequest) -> Self {
        Self {
            filters: None,
            sorts: None,
            page,
        }
    }

    pub fn with_filters(mut self, filters: Vec<FilterClause>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_sorts(mut self, sorts: Vec<SortClause>) -> Self {
        self.sorts = Some(sorts);
        self
    }

    pub fn filters(&self) -> Option<&[FilterClause]> {
        self.filters.as_deref()
    }

    pub fn sorts(&self) -> Option<&[SortClause]> {
        self.sorts.as_deref()
    }

    /// Stable fingerprint of this request, see [`fingerprint::list_fingerprint`].
    pub fn fingerprint(&self, scope: &[(&str, &str)]) -> String {
        fingerprint::list_fingerprint(self, scope)
    }
}
