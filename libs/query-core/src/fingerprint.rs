//! Deterministic request fingerprints used to build collection cache keys.

use sha2::{Digest, Sha256};

use crate::ast::SortDir;
use crate::ListQuery;

/// Canonical text form of a list request.
///
/// Filter clauses are AND-ed, so their order does not matter and they are sorted.
/// Sort order is significant and kept as given.
#[must_use]
pub fn normalize_list_query(query: &ListQuery, scope: &[(&str, &str)]) -> String {
    let mut parts = Vec::new();

    let mut scope: Vec<_> = scope.to_vec();
    scope.sort();
    for (k, v) in scope {
        parts.push(format!("SCOPE({k},{v:?})"));
    }

    if let Some(filters) = query.filters() {
        let mut filters: Vec<String> = filters
            .iter()
            .map(|f| format!("F({},{},{:?})", f.field, f.op.as_token(), f.value))
            .collect();
        filters.sort();
        parts.extend(filters);
    }

    if let Some(sorts) = query.sorts() {
        for s in sorts {
            let dir = match s.dir {
                SortDir::Asc => "ASC",
                SortDir::Desc => "DESC",
            };
            parts.push(format!("S({},{dir})", s.field));
        }
    }

    parts.push(format!("P({},{})", query.page.page(), query.page.per_page()));
    parts.join(";")
}

/// 16 hex chars (first 8 bytes of SHA-256 over the normalized form).
#[must_use]
pub fn list_fingerprint(query: &ListQuery, scope: &[(&str, &str)]) -> String {
    let normalized = normalize_list_query(query, scope);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let bytes = hasher.finalize();
    hex::encode(&bytes[..8])
}
