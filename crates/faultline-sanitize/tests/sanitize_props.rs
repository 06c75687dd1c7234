use faultline_sanitize::{
    filter_url, sanitize, Data, KeyFilter, SharedData, DEFAULT_MAX_DEPTH, FILTERED,
    RECURSION_HALTED,
};
use proptest::prelude::*;
use serde_json::json;

fn arb_data() -> impl Strategy<Value = Data> {
    let leaf = prop_oneof![
        Just(Data::Null),
        any::<bool>().prop_map(Data::Bool),
        any::<i64>().prop_map(Data::Int),
        any::<f64>().prop_map(Data::Float),
        ".{0,12}".prop_map(Data::Str),
    ];
    leaf.prop_recursive(6, 64, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Data::Seq),
            proptest::collection::vec(("[a-z_]{1,8}", inner), 0..6).prop_map(Data::Map),
        ]
    })
}

proptest! {
    #[test]
    fn prop_sanitize_output_always_serializes(data in arb_data()) {
        let filters = vec![KeyFilter::exact("abc"), KeyFilter::pattern("private").unwrap()];
        let clean = sanitize(&data, &filters, DEFAULT_MAX_DEPTH);
        prop_assert!(serde_json::to_string(&clean).is_ok());
    }

    #[test]
    fn prop_sanitize_is_deterministic(data in arb_data()) {
        let a = sanitize(&data, &[], 4);
        let b = sanitize(&data, &[], 4);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_filtered_key_never_leaks_non_mappings(data in arb_data()) {
        let wrapped = Data::from_pairs([("abc", data.clone())]);
        let clean = sanitize(&wrapped, &[KeyFilter::exact("abc")], DEFAULT_MAX_DEPTH);
        if matches!(data, Data::Map(_)) {
            prop_assert!(clean["abc"].is_object());
        } else {
            prop_assert_eq!(&clean["abc"], &json!(FILTERED));
        }
    }

    #[test]
    fn prop_filter_url_never_panics(s in ".{0,40}") {
        let _ = filter_url(&s, &[KeyFilter::exact("bar")]);
    }
}

#[test]
fn filters_by_exact_and_pattern() {
    let filters = vec![KeyFilter::exact("abc"), KeyFilter::pattern("private").unwrap()];
    let input = Data::from_pairs([("abc", "1"), ("private_x", "2"), ("ghi", "3")]);
    assert_eq!(
        sanitize(&input, &filters, DEFAULT_MAX_DEPTH),
        json!({"abc": FILTERED, "private_x": FILTERED, "ghi": "3"})
    );
}

#[test]
fn deep_cycle_through_sequence_is_halted() {
    let root = SharedData::new(Data::map());
    let list = SharedData::new(Data::Seq(vec![Data::from(1), Data::Shared(root.clone())]));
    root.insert("list", list);

    let clean = sanitize(&Data::Shared(root), &[], DEFAULT_MAX_DEPTH);
    assert_eq!(clean, json!({"list": [1, RECURSION_HALTED]}));
}
