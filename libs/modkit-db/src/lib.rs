//! ModKit record-store layer.
//!
//! - [`store`]: the `RecordStore` / `Transaction` contract modules program against.
//! - [`query`]: field registry and `QueryChainer`, turning parsed list clauses into a `QueryPlan`.
//! - [`document`]: JSON document helpers, comparable scalars, the `$numberDecimal` wire form.
//! - [`memory`]: an in-process implementation of the store contract.
//!
//! # Example
//! ```rust,no_run
//! use modkit_db::{FieldKind, FieldMap, MemoryStore, QueryChainer};
//! use query_core::{parse_filters, PaginationRequest};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let fields = FieldMap::new().insert("name", "name", FieldKind::String);
//! let filters = parse_filters(Some(&["name:like:orb"][..]))?;
//! let page = PaginationRequest::new(1, 20)?;
//!
//! let result = QueryChainer::new("items", &fields)
//!     .filter(filters.as_deref())?
//!     .fetch_page::<serde_json::Value>(&store, &page)
//!     .await?;
//! println!("{} of {}", result.items.len(), result.pagination.total_items);
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod memory;
pub mod query;
pub mod store;

pub use document::{from_document, to_document, Document, Scalar, DECIMAL_TAG, ID_FIELD};
pub use memory::MemoryStore;
pub use query::{
    CmpOp, Field, FieldKind, FieldMap, Paged, Predicate, QueryBuildError, QueryBuildResult,
    QueryChainer, QueryPlan, SortKey,
};
pub use store::{DbError, DbResult, RecordStore, Transaction};
