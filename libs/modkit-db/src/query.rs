//! Filter/sort clauses → store-native query plan.
//!
//! Flat fields are resolved through a [`FieldMap`] and coerced to the declared kind.
//! Dotted fields address embedded documents and bypass the registry: they are passed
//! to the store as raw documents, with decimal comparisons in the `$numberDecimal` form.

use std::cmp::Ordering;
use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use query_core::{FilterClause, FilterOp, PaginationRequest, PaginationResult, SortClause, SortDir};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::document::{decimal_value, Document, Scalar};
use crate::store::{project, DbResult, RecordStore};

/// Declared type of a queryable field, used to coerce clause values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Decimal,
}

#[derive(Clone, Debug)]
pub struct Field {
    /// Path of the field inside stored documents.
    pub path: String,
    pub kind: FieldKind,
}

/// Whitelist of queryable fields for one record type, keyed by lower-cased API name.
#[derive(Clone, Debug, Default)]
pub struct FieldMap {
    map: HashMap<String, Field>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, api_name: impl Into<String>, path: impl Into<String>, kind: FieldKind) -> Self {
        self.map.insert(
            api_name.into().to_lowercase(),
            Field {
                path: path.into(),
                kind,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.map.get(&name.to_lowercase())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    /// Operator name in raw query documents.
    pub const fn operator(self) -> &'static str {
        match self {
            CmpOp::Eq => "$eq",
            CmpOp::Ne => "$ne",
            CmpOp::Gt => "$gt",
            CmpOp::Gte => "$gte",
            CmpOp::Lt => "$lt",
            CmpOp::Lte => "$lte",
        }
    }

    pub fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "$eq" => CmpOp::Eq,
            "$ne" => CmpOp::Ne,
            "$gt" => CmpOp::Gt,
            "$gte" => CmpOp::Gte,
            "$lt" => CmpOp::Lt,
            "$lte" => CmpOp::Lte,
            _ => return None,
        })
    }

    /// Whether `actual <op> expected` holds given `actual.cmp(expected)`.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Gte => ord != Ordering::Less,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Lte => ord != Ordering::Greater,
        }
    }

    fn from_filter(op: FilterOp) -> Option<Self> {
        Some(match op {
            FilterOp::Eq => CmpOp::Eq,
            FilterOp::Ne => CmpOp::Ne,
            FilterOp::Gt => CmpOp::Gt,
            FilterOp::Gte => CmpOp::Gte,
            FilterOp::Lt => CmpOp::Lt,
            FilterOp::Lte => CmpOp::Lte,
            FilterOp::Like => return None,
        })
    }
}

/// Store-native predicate. A plan's predicates are AND-ed.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        path: String,
        op: CmpOp,
        value: Scalar,
    },
    Regex {
        path: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Raw query document, e.g. `{"a.b": {"$gt": {"$numberDecimal": "1"}}}`.
    Raw(Document),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(path: impl Into<String>, value: Scalar) -> Self {
        Predicate::Compare {
            path: path.into(),
            op: CmpOp::Eq,
            value,
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::eq(crate::document::ID_FIELD, Scalar::String(id.into()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub dir: SortDir,
}

/// Composed, not-yet-executed query against one collection.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortKey>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryPlan {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            predicates: Vec::new(),
            sort: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    /// All predicates as one conjunction.
    pub fn predicate(&self) -> Predicate {
        Predicate::And(self.predicates.clone())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("type mismatch on '{field}': expected {expected:?}, got '{value}'")]
    TypeMismatch {
        field: String,
        expected: FieldKind,
        value: String,
    },

    #[error("operation '{op}' is not supported on nested field '{field}'")]
    UnsupportedNestedOperation { field: String, op: FilterOp },

    #[error("invalid decimal value for '{field}': '{value}'")]
    InvalidDecimal { field: String, value: String },
}

pub type QueryBuildResult<T> = Result<T, QueryBuildError>;

/* ---------- coercion ---------- */

fn coerce(field_name: &str, kind: FieldKind, raw: &str) -> QueryBuildResult<Scalar> {
    let mismatch = || QueryBuildError::TypeMismatch {
        field: field_name.to_string(),
        expected: kind,
        value: raw.to_string(),
    };

    Ok(match kind {
        FieldKind::String => Scalar::String(raw.to_string()),
        FieldKind::I64 => Scalar::Int(raw.parse().map_err(|_| mismatch())?),
        FieldKind::F64 => Scalar::Double(raw.parse().map_err(|_| mismatch())?),
        FieldKind::Bool => Scalar::Bool(raw.to_ascii_lowercase().parse().map_err(|_| mismatch())?),
        FieldKind::Uuid => {
            let id: uuid::Uuid = raw.parse().map_err(|_| mismatch())?;
            Scalar::String(id.to_string())
        }
        FieldKind::DateTimeUtc => Scalar::DateTime(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| mismatch())?
                .with_timezone(&Utc),
        ),
        FieldKind::Decimal => Scalar::Decimal(raw.parse().map_err(|_| mismatch())?),
    })
}

fn parse_decimal(field: &str, raw: &str) -> QueryBuildResult<BigDecimal> {
    raw.parse().map_err(|_| QueryBuildError::InvalidDecimal {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// `like` is a case-insensitive substring match; the value is matched literally.
fn like_pattern(value: &str) -> String {
    regex::escape(value)
}

#[inline]
fn ensure_string_field(field_name: &str, f: &Field) -> QueryBuildResult<()> {
    if f.kind != FieldKind::String {
        return Err(QueryBuildError::TypeMismatch {
            field: field_name.to_string(),
            expected: f.kind,
            value: "like pattern".to_string(),
        });
    }
    Ok(())
}

/* ---------- clause translation ---------- */

fn nested_predicate(clause: &FilterClause) -> QueryBuildResult<Predicate> {
    let condition = match CmpOp::from_filter(clause.op) {
        Some(CmpOp::Eq | CmpOp::Ne) => {
            return Err(QueryBuildError::UnsupportedNestedOperation {
                field: clause.field.clone(),
                op: clause.op,
            })
        }
        Some(cmp) => {
            let value = parse_decimal(&clause.field, &clause.value)?;
            let mut cond = Document::new();
            cond.insert(cmp.operator().to_string(), decimal_value(&value));
            Value::Object(cond)
        }
        None => json!({ "$regex": like_pattern(&clause.value), "$options": "i" }),
    };

    let mut raw = Document::new();
    raw.insert(clause.field.clone(), condition);
    Ok(Predicate::Raw(raw))
}

pub fn clause_to_predicate(fields: &FieldMap, clause: &FilterClause) -> QueryBuildResult<Predicate> {
    if clause.is_nested() {
        return nested_predicate(clause);
    }

    let field = fields
        .get(&clause.field)
        .ok_or_else(|| QueryBuildError::UnknownField(clause.field.clone()))?;

    match CmpOp::from_filter(clause.op) {
        Some(op) => Ok(Predicate::Compare {
            path: field.path.clone(),
            op,
            value: coerce(&clause.field, field.kind, &clause.value)?,
        }),
        None => {
            ensure_string_field(&clause.field, field)?;
            Ok(Predicate::Regex {
                path: field.path.clone(),
                pattern: like_pattern(&clause.value),
                case_insensitive: true,
            })
        }
    }
}

pub fn clause_to_sort_key(fields: &FieldMap, clause: &SortClause) -> QueryBuildResult<SortKey> {
    let path = if clause.is_nested() {
        clause.field.clone()
    } else {
        fields
            .get(&clause.field)
            .ok_or_else(|| QueryBuildError::UnknownField(clause.field.clone()))?
            .path
            .clone()
    };
    Ok(SortKey {
        path,
        dir: clause.dir,
    })
}

/* ---------- chainer ---------- */

/// Incrementally builds a [`QueryPlan`]: `filter → sort → paginate`.
///
/// Cloning after filter+sort and before `paginate` yields the count-only variant.
#[derive(Clone, Debug)]
pub struct QueryChainer<'a> {
    fields: &'a FieldMap,
    plan: QueryPlan,
}

/// One page of projected records plus its pagination metadata.
#[derive(Clone, Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}

impl<'a> QueryChainer<'a> {
    pub fn new(collection: impl Into<String>, fields: &'a FieldMap) -> Self {
        Self {
            fields,
            plan: QueryPlan::new(collection),
        }
    }

    /// Add a fixed predicate (scoping) that is not derived from client input.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.plan.predicates.push(predicate);
        self
    }

    /// `None` leaves the plan untouched.
    pub fn filter(mut self, clauses: Option<&[FilterClause]>) -> QueryBuildResult<Self> {
        for clause in clauses.unwrap_or_default() {
            let predicate = clause_to_predicate(self.fields, clause)?;
            self.plan.predicates.push(predicate);
        }
        Ok(self)
    }

    pub fn sort(mut self, clauses: Option<&[SortClause]>) -> QueryBuildResult<Self> {
        for clause in clauses.unwrap_or_default() {
            let key = clause_to_sort_key(self.fields, clause)?;
            self.plan.sort.push(key);
        }
        Ok(self)
    }

    pub fn paginate(mut self, page: &PaginationRequest) -> Self {
        self.plan.skip = Some(page.offset());
        self.plan.limit = Some(page.per_page());
        self
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn into_plan(self) -> QueryPlan {
        self.plan
    }

    /// Count the filtered set, then fetch and project one page of it.
    pub async fn fetch_page<T: DeserializeOwned>(
        self,
        store: &dyn RecordStore,
        page: &PaginationRequest,
    ) -> DbResult<Paged<T>> {
        let counted = self.clone();
        let total = store.count(counted.plan()).await?;
        let docs = store.find(&self.paginate(page).into_plan()).await?;
        Ok(Paged {
            items: project(docs)?,
            pagination: query_core::page::compute(page, total),
        })
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod query_tests;
