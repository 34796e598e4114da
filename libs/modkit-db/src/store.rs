//! Record-store contract consumed by the query layer and the modules.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::document::{from_document, Document};
use crate::query::{Predicate, QueryPlan};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("duplicate key on {collection}.{field}")]
    DuplicateKey { collection: String, field: String },

    #[error("document decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("record did not serialize to a document")]
    NotADocument,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("write conflict on collection '{0}'")]
    WriteConflict(String),

    #[error("store transport error: {0}")]
    Transport(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Document store with cursor-style reads and multi-document transactions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Matching documents, sorted and windowed as the plan says.
    async fn find(&self, plan: &QueryPlan) -> DbResult<Vec<Document>>;

    /// Number of matching documents; `skip`/`limit` are ignored.
    async fn count(&self, plan: &QueryPlan) -> DbResult<u64>;

    async fn find_one(&self, collection: &str, filter: &Predicate) -> DbResult<Option<Document>>;

    async fn insert_one(&self, collection: &str, doc: Document) -> DbResult<()>;

    async fn delete_many(&self, collection: &str, filter: &Predicate) -> DbResult<u64>;

    async fn start_transaction(&self) -> DbResult<Box<dyn Transaction>>;
}

/// Writes staged here become visible to other readers only on [`Transaction::commit`].
#[async_trait]
pub trait Transaction: Send {
    async fn find_one(&mut self, collection: &str, filter: &Predicate) -> DbResult<Option<Document>>;

    /// Returns `false` when nothing matched.
    async fn replace_one(&mut self, collection: &str, filter: &Predicate, doc: Document) -> DbResult<bool>;

    async fn delete_one(&mut self, collection: &str, filter: &Predicate) -> DbResult<bool>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn abort(self: Box<Self>) -> DbResult<()>;
}

/// Project raw documents into a response shape.
pub fn project<T: DeserializeOwned>(docs: Vec<Document>) -> DbResult<Vec<T>> {
    docs.into_iter().map(from_document).collect()
}
