use proptest::prelude::*;
use query_core::parse::parse_filter;
use query_core::FilterOp;

fn op_strategy() -> impl Strategy<Value = FilterOp> {
    prop::sample::select(FilterOp::ALL.to_vec())
}

proptest! {
    #[test]
    fn valid_tokens_round_trip(
        field in "[A-Za-z][A-Za-z0-9_]{0,15}(\\.[a-z_]{1,10})?",
        op in op_strategy(),
        value in "[^:]{1,200}",
    ) {
        let token = format!("{field}:{}:{value}", op.as_token());
        let clause = parse_filter(&token).unwrap();

        prop_assert_eq!(&clause.field, &field.to_lowercase());
        prop_assert_eq!(clause.op, op);
        prop_assert_eq!(&clause.value, &value);

        let again = parse_filter(&clause.to_token()).unwrap();
        prop_assert_eq!(again, clause);
    }

    #[test]
    fn tokens_without_three_parts_are_rejected(field in "[a-z]{1,10}", value in "[a-z]{1,10}") {
        let two_parts = format!("{field}:{value}");
        let four_parts = format!("{field}:=:{value}:{value}");
        prop_assert!(parse_filter(&two_parts).is_err());
        prop_assert!(parse_filter(&four_parts).is_err());
    }

    #[test]
    fn sort_token_direction(field in "[a-z][a-z_]{0,20}") {
        let asc = query_core::parse::parse_sort(&field).unwrap();
        prop_assert_eq!(asc.dir, query_core::SortDir::Asc);
        let desc = query_core::parse::parse_sort(&format!("-{field}")).unwrap();
        prop_assert_eq!(desc.dir, query_core::SortDir::Desc);
        prop_assert_eq!(desc.field, field);
    }
}
