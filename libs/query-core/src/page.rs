use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default page size when `per_page` is not supplied.
pub const ITEMS_PER_PAGE: u64 = 20;
/// Upper bound for `per_page`; larger requests are rejected, not clamped.
pub const MAXIMUM_ITEMS_PER_PAGE: u64 = 100;

/// Validated offset-pagination input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationRequest {
    page: u64,
    per_page: u64,
}

impl PaginationRequest {
    /// Validate against [`MAXIMUM_ITEMS_PER_PAGE`].
    pub fn new(page: u64, per_page: u64) -> Result<Self, Error> {
        Self::with_max(page, per_page, MAXIMUM_ITEMS_PER_PAGE)
    }

    pub fn with_max(page: u64, per_page: u64, max_per_page: u64) -> Result<Self, Error> {
        if page == 0 {
            return Err(Error::InvalidPagination {
                field: "page",
                message: "must be greater than 0".into(),
            });
        }
        if per_page == 0 || per_page > max_per_page {
            return Err(Error::InvalidPagination {
                field: "per_page",
                message: format!("must be between 1 and {max_per_page}"),
            });
        }
        Ok(Self { page, per_page })
    }

    #[inline]
    pub fn page(&self) -> u64 {
        self.page
    }

    #[inline]
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of records to skip: `(page - 1) * per_page`.
    #[inline]
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: ITEMS_PER_PAGE,
        }
    }
}

/// Pagination metadata returned next to a page of records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// `total_pages = ceil(total_items / per_page)`, zero when there are no items.
pub fn compute(request: &PaginationRequest, total_items: u64) -> PaginationResult {
    PaginationResult {
        page: request.page,
        per_page: request.per_page,
        total_items,
        total_pages: total_items.div_ceil(request.per_page),
    }
}

/// Page-size policy shared by every list endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationCalculator {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for PaginationCalculator {
    fn default() -> Self {
        Self {
            default_per_page: ITEMS_PER_PAGE,
            max_per_page: MAXIMUM_ITEMS_PER_PAGE,
        }
    }
}

impl PaginationCalculator {
    pub fn new(default_per_page: u64, max_per_page: u64) -> Self {
        Self {
            default_per_page,
            max_per_page,
        }
    }

    /// Build a request from optional raw parameters (`page` defaults to 1).
    pub fn request(&self, page: Option<u64>, per_page: Option<u64>) -> Result<PaginationRequest, Error> {
        PaginationRequest::with_max(
            page.unwrap_or(1),
            per_page.unwrap_or(self.default_per_page),
            self.max_per_page,
        )
    }

    pub fn compute(&self, request: &PaginationRequest, total_items: u64) -> PaginationResult {
        compute(request, total_items)
    }
}
