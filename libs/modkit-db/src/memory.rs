//! In-process document store.
//!
//! Predicates are compiled once per call into matchers; collections live behind a
//! single `RwLock` that is never held across an `.await`. Transactions stage a
//! copy of every collection they touch and apply it on commit if nobody else wrote
//! to that collection in the meantime.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use query_core::SortDir;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::document::{get_path, sort_order, Document, Scalar, DECIMAL_TAG, ID_FIELD};
use crate::query::{CmpOp, Predicate, QueryPlan, SortKey};
use crate::store::{DbError, DbResult, RecordStore, Transaction};

#[derive(Default)]
struct Collection {
    docs: Vec<Document>,
    version: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    unique: Arc<HashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would give two documents the same non-null `field`.
    /// `_id` is always unique.
    pub fn with_unique_index(mut self, collection: &str, field: &str) -> Self {
        Arc::make_mut(&mut self.unique)
            .entry(collection.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    fn check_unique(
        &self,
        collection: &str,
        docs: &[Document],
        candidate: &Document,
        replacing: Option<usize>,
    ) -> DbResult<()> {
        let extra = self.unique.get(collection).map(Vec::as_slice).unwrap_or_default();
        let fields = std::iter::once(ID_FIELD).chain(extra.iter().map(String::as_str));

        for field in fields {
            let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = docs
                .iter()
                .enumerate()
                .any(|(i, d)| Some(i) != replacing && d.get(field) == Some(value));
            if clash {
                return Err(DbError::DuplicateKey {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    fn matching(&self, collection: &str, filter: &Predicate) -> DbResult<Vec<Document>> {
        let matcher = compile(filter)?;
        let guard = self.collections.read();
        Ok(guard
            .get(collection)
            .map(|c| {
                c.docs
                    .iter()
                    .filter(|d| matcher.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, plan: &QueryPlan) -> DbResult<Vec<Document>> {
        let mut docs = self.matching(&plan.collection, &plan.predicate())?;
        sort_documents(&mut docs, &plan.sort);

        let skip = plan.skip.map_or(0, to_usize);
        let limit = plan.limit.map_or(usize::MAX, to_usize);
        let page: Vec<Document> = docs.into_iter().skip(skip).take(limit).collect();

        tracing::debug!(
            collection = %plan.collection,
            returned = page.len(),
            "memory store find"
        );
        Ok(page)
    }

    async fn count(&self, plan: &QueryPlan) -> DbResult<u64> {
        let matcher = compile(&plan.predicate())?;
        let guard = self.collections.read();
        let n = guard
            .get(&plan.collection)
            .map_or(0, |c| c.docs.iter().filter(|d| matcher.matches(d)).count());
        Ok(n as u64)
    }

    async fn find_one(&self, collection: &str, filter: &Predicate) -> DbResult<Option<Document>> {
        let matcher = compile(filter)?;
        let guard = self.collections.read();
        Ok(guard
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| matcher.matches(d)).cloned()))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> DbResult<()> {
        if !doc.contains_key(ID_FIELD) {
            doc.insert(
                ID_FIELD.to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }

        let mut guard = self.collections.write();
        let coll = guard.entry(collection.to_string()).or_default();
        self.check_unique(collection, &coll.docs, &doc, None)?;
        coll.docs.push(doc);
        coll.version += 1;
        Ok(())
    }

    async fn delete_many(&self, collection: &str, filter: &Predicate) -> DbResult<u64> {
        let matcher = compile(filter)?;
        let mut guard = self.collections.write();
        let Some(coll) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = coll.docs.len();
        coll.docs.retain(|d| !matcher.matches(d));
        let removed = before - coll.docs.len();
        if removed > 0 {
            coll.version += 1;
        }
        Ok(removed as u64)
    }

    async fn start_transaction(&self) -> DbResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            staged: HashMap::new(),
        }))
    }
}

struct Staged {
    base_version: u64,
    docs: Vec<Document>,
    dirty: bool,
}

struct MemoryTransaction {
    store: MemoryStore,
    staged: HashMap<String, Staged>,
}

impl MemoryTransaction {
    fn staged(&mut self, collection: &str) -> &mut Staged {
        let store = &self.store;
        self.staged
            .entry(collection.to_string())
            .or_insert_with(|| {
                let guard = store.collections.read();
                let current = guard.get(collection);
                Staged {
                    base_version: current.map_or(0, |c| c.version),
                    docs: current.map(|c| c.docs.clone()).unwrap_or_default(),
                    dirty: false,
                }
            })
    }

    fn position(&mut self, collection: &str, filter: &Predicate) -> DbResult<Option<usize>> {
        let matcher = compile(filter)?;
        Ok(self
            .staged(collection)
            .docs
            .iter()
            .position(|d| matcher.matches(d)))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_one(&mut self, collection: &str, filter: &Predicate) -> DbResult<Option<Document>> {
        let Some(idx) = self.position(collection, filter)? else {
            return Ok(None);
        };
        Ok(self.staged(collection).docs.get(idx).cloned())
    }

    async fn replace_one(&mut self, collection: &str, filter: &Predicate, doc: Document) -> DbResult<bool> {
        let Some(idx) = self.position(collection, filter)? else {
            return Ok(false);
        };
        let Self { store, staged } = self;
        let Some(staged) = staged.get_mut(collection) else {
            return Ok(false);
        };
        store.check_unique(collection, &staged.docs, &doc, Some(idx))?;
        staged.docs[idx] = doc;
        staged.dirty = true;
        Ok(true)
    }

    async fn delete_one(&mut self, collection: &str, filter: &Predicate) -> DbResult<bool> {
        let Some(idx) = self.position(collection, filter)? else {
            return Ok(false);
        };
        let staged = self.staged(collection);
        staged.docs.remove(idx);
        staged.dirty = true;
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryTransaction { store, staged } = *self;
        let mut guard = store.collections.write();

        for (name, staged) in staged.iter().filter(|(_, s)| s.dirty) {
            let current = guard.get(name).map_or(0, |c| c.version);
            if current != staged.base_version {
                return Err(DbError::WriteConflict(name.clone()));
            }
        }

        for (name, staged) in staged.into_iter().filter(|(_, s)| s.dirty) {
            let coll = guard.entry(name).or_default();
            coll.docs = staged.docs;
            coll.version += 1;
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> DbResult<()> {
        tracing::debug!(collections = self.staged.len(), "transaction aborted");
        Ok(())
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ord = sort_order(get_path(a, &key.path), get_path(b, &key.path));
                match key.dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/* ---------- predicate compilation ---------- */

enum Matcher {
    Compare {
        path: String,
        op: CmpOp,
        value: Scalar,
    },
    Regex {
        path: String,
        re: Regex,
    },
    All(Vec<Matcher>),
}

impl Matcher {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            // A missing field behaves like null.
            Matcher::Compare { path, op, value } => {
                match get_path(doc, path).map_or(Some(Scalar::Null), Scalar::from_value) {
                    Some(actual) => actual
                        .compare(value)
                        .map_or(*op == CmpOp::Ne, |ord| op.holds(ord)),
                    None => *op == CmpOp::Ne,
                }
            }
            Matcher::Regex { path, re } => get_path(doc, path)
                .and_then(Value::as_str)
                .is_some_and(|s| re.is_match(s)),
            Matcher::All(all) => all.iter().all(|m| m.matches(doc)),
        }
    }
}

fn build_regex(pattern: &str, case_insensitive: bool) -> DbResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| DbError::InvalidQuery(e.to_string()))
}

fn compile(predicate: &Predicate) -> DbResult<Matcher> {
    Ok(match predicate {
        Predicate::Compare { path, op, value } => Matcher::Compare {
            path: path.clone(),
            op: *op,
            value: value.clone(),
        },
        Predicate::Regex {
            path,
            pattern,
            case_insensitive,
        } => Matcher::Regex {
            path: path.clone(),
            re: build_regex(pattern, *case_insensitive)?,
        },
        Predicate::Raw(doc) => compile_raw(doc)?,
        Predicate::And(all) => Matcher::All(all.iter().map(compile).collect::<DbResult<_>>()?),
    })
}

fn is_operator_doc(ops: &Document) -> bool {
    !ops.is_empty() && !ops.contains_key(DECIMAL_TAG) && ops.keys().all(|k| k.starts_with('$'))
}

fn operand(op: &str, value: &Value) -> DbResult<Scalar> {
    Scalar::from_value(value)
        .ok_or_else(|| DbError::InvalidQuery(format!("operand of '{op}' is not comparable")))
}

fn compile_raw(doc: &Document) -> DbResult<Matcher> {
    let mut out = Vec::with_capacity(doc.len());

    for (path, condition) in doc {
        match condition {
            Value::Object(ops) if is_operator_doc(ops) => {
                let case_insensitive = ops
                    .get("$options")
                    .and_then(Value::as_str)
                    .is_some_and(|o| o.contains('i'));

                for (op, arg) in ops {
                    match op.as_str() {
                        "$options" => {}
                        "$regex" => {
                            let pattern = arg.as_str().ok_or_else(|| {
                                DbError::InvalidQuery("'$regex' expects a string".into())
                            })?;
                            out.push(Matcher::Regex {
                                path: path.clone(),
                                re: build_regex(pattern, case_insensitive)?,
                            });
                        }
                        other => {
                            let cmp = CmpOp::from_operator(other).ok_or_else(|| {
                                DbError::InvalidQuery(format!("unsupported operator '{other}'"))
                            })?;
                            out.push(Matcher::Compare {
                                path: path.clone(),
                                op: cmp,
                                value: operand(other, arg)?,
                            });
                        }
                    }
                }
            }
            literal => out.push(Matcher::Compare {
                path: path.clone(),
                op: CmpOp::Eq,
                value: operand("$eq", literal)?,
            }),
        }
    }

    Ok(Matcher::All(out))
}
