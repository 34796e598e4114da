use super::*;
use axum::http::Request;
use query_core::{FilterOp, SortDir};

fn parse(raw: &str) -> Result<ListQuery, ApiError> {
    parse_list_query(raw, &PaginationCalculator::default())
}

#[test]
fn test_defaults_when_absent() {
    let q = parse("").unwrap();
    assert_eq!(q.filters, None);
    assert_eq!(q.sorts, None);
    assert_eq!((q.page.page(), q.page.per_page()), (1, 20));
}

#[test]
fn test_repeated_filters_and_sorts() {
    let q = parse(
        "filter=category%3Alike%3Acurrency&filter=name:!=:Chaos%20Orb&sort=-price_info.chaos_price&sort=name&page=2&per_page=5",
    )
    .unwrap();

    let filters = q.filters().unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].op, FilterOp::Like);
    assert_eq!(filters[1].value, "Chaos Orb");

    let sorts = q.sorts().unwrap();
    assert_eq!(sorts[0].dir, SortDir::Desc);
    assert_eq!(sorts[1].field, "name");
    assert_eq!(q.page.offset(), 5);
}

#[test]
fn test_present_but_blank_filter_is_rejected() {
    assert!(matches!(
        parse("filter="),
        Err(ApiError::InvalidInput { .. })
    ));
}

#[test]
fn test_non_numeric_pagination_lists_every_field() {
    match parse("page=first&per_page=many") {
        Err(ApiError::Validation { fields }) => {
            let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, ["page", "per_page"]);
            assert!(fields.iter().all(|f| f.error_type == "expected_int"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_page_size_limit_comes_from_calculator() {
    let strict = PaginationCalculator::new(10, 25);
    assert!(parse_list_query("per_page=30", &strict).is_err());
    assert!(parse("per_page=30").is_ok());
    assert_eq!(
        parse_list_query("", &strict).unwrap().page.per_page(),
        10
    );
}

#[tokio::test]
async fn test_extractor_uses_request_extension() {
    let (mut parts, _) = Request::builder()
        .uri("/items?per_page=30")
        .extension(PaginationCalculator::new(10, 25))
        .body(())
        .unwrap()
        .into_parts();

    let rejected = ListParams::from_request_parts(&mut parts, &()).await;
    assert!(matches!(rejected, Err(ApiError::Validation { .. })));
}
