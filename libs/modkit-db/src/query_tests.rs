use super::*;
use query_core::parse::{parse_filter, parse_sort};
use serde_json::json;

fn item_fields() -> FieldMap {
    FieldMap::new()
        .insert("name", "name", FieldKind::String)
        .insert("category", "category", FieldKind::String)
        .insert("enabled", "enabled", FieldKind::Bool)
        .insert("stack_size", "stack_size", FieldKind::I64)
        .insert("created_time", "created_time", FieldKind::DateTimeUtc)
}

fn filter_one(token: &str) -> QueryBuildResult<Predicate> {
    clause_to_predicate(&item_fields(), &parse_filter(token).unwrap())
}

#[test]
fn test_flat_comparison_is_coerced() {
    let p = filter_one("stack_size:>=:10").unwrap();
    assert_eq!(
        p,
        Predicate::Compare {
            path: "stack_size".into(),
            op: CmpOp::Gte,
            value: Scalar::Int(10),
        }
    );

    let p = filter_one("enabled:=:TRUE").unwrap();
    assert!(matches!(p, Predicate::Compare { value: Scalar::Bool(true), .. }));
}

#[test]
fn test_field_lookup_is_case_insensitive() {
    assert!(item_fields().get("NAME").is_some());
}

#[test]
fn test_type_mismatch() {
    let err = filter_one("stack_size:=:lots").unwrap_err();
    assert!(matches!(
        err,
        QueryBuildError::TypeMismatch {
            expected: FieldKind::I64,
            ..
        }
    ));
    assert!(filter_one("created_time:>:yesterday").is_err());
}

#[test]
fn test_like_is_escaped_case_insensitive_regex() {
    let p = filter_one("name:like:a.b(c").unwrap();
    assert_eq!(
        p,
        Predicate::Regex {
            path: "name".into(),
            pattern: r"a\.b\(c".into(),
            case_insensitive: true,
        }
    );
}

#[test]
fn test_like_requires_string_field() {
    assert!(matches!(
        filter_one("stack_size:like:1"),
        Err(QueryBuildError::TypeMismatch { .. })
    ));
}

#[test]
fn test_unknown_flat_field_rejected() {
    assert_eq!(
        filter_one("colour:=:red").unwrap_err(),
        QueryBuildError::UnknownField("colour".into())
    );
}

#[test]
fn test_nested_range_uses_decimal_wire_form() {
    let p = filter_one("price_info.chaos_price:>:12.5").unwrap();
    let Predicate::Raw(doc) = p else {
        panic!("expected raw predicate");
    };
    assert_eq!(
        serde_json::Value::Object(doc),
        json!({"price_info.chaos_price": {"$gt": {"$numberDecimal": "12.5"}}})
    );
}

#[test]
fn test_nested_like_is_raw_regex() {
    let Predicate::Raw(doc) = filter_one("price_info.note:like:cheap").unwrap() else {
        panic!("expected raw predicate");
    };
    assert_eq!(
        serde_json::Value::Object(doc),
        json!({"price_info.note": {"$regex": "cheap", "$options": "i"}})
    );
}

#[test]
fn test_nested_equality_unsupported() {
    for token in ["price_info.chaos_price:=:1", "price_info.chaos_price:!=:1"] {
        assert!(matches!(
            filter_one(token),
            Err(QueryBuildError::UnsupportedNestedOperation { .. })
        ));
    }
}

#[test]
fn test_nested_range_requires_decimal() {
    assert!(matches!(
        filter_one("price_info.chaos_price:<:cheap"),
        Err(QueryBuildError::InvalidDecimal { .. })
    ));
}

#[test]
fn test_sort_resolves_flat_and_passes_nested_through() {
    let fields = item_fields();
    let sorts = vec![
        parse_sort("-price_info.chaos_price").unwrap(),
        parse_sort("Name").unwrap(),
    ];
    let chain = QueryChainer::new("items", &fields).sort(Some(sorts.as_slice())).unwrap();
    assert_eq!(
        chain.plan().sort,
        vec![
            SortKey {
                path: "price_info.chaos_price".into(),
                dir: SortDir::Desc,
            },
            SortKey {
                path: "name".into(),
                dir: SortDir::Asc,
            },
        ]
    );

    let bad = vec![parse_sort("weight").unwrap()];
    assert!(QueryChainer::new("items", &fields).sort(Some(bad.as_slice())).is_err());
}

#[test]
fn test_clone_before_paginate_keeps_count_plan_unwindowed() {
    let fields = item_fields();
    let filters = vec![parse_filter("category:like:currency").unwrap()];
    let base = QueryChainer::new("items", &fields)
        .with_predicate(Predicate::eq("enabled", Scalar::Bool(true)))
        .filter(Some(filters.as_slice()))
        .unwrap();

    let counted = base.clone();
    let page = PaginationRequest::new(3, 10).unwrap();
    let paged = base.paginate(&page);

    assert_eq!(counted.plan().skip, None);
    assert_eq!(counted.plan().limit, None);
    assert_eq!(paged.plan().skip, Some(20));
    assert_eq!(paged.plan().limit, Some(10));
    assert_eq!(counted.plan().predicates, paged.plan().predicates);
    assert_eq!(paged.plan().predicates.len(), 2);
}

#[test]
fn test_absent_clauses_leave_plan_empty() {
    let fields = item_fields();
    let chain = QueryChainer::new("items", &fields)
        .filter(None)
        .unwrap()
        .sort(None)
        .unwrap();
    assert_eq!(chain.into_plan(), QueryPlan::new("items"));
}
