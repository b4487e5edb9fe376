//! Property tests for the JSON tree: anything we serialize must reparse
//! to the identical tree.

use proptest::prelude::*;
use skysave_json::JsonValue;

fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,12}").unwrap()
}

fn leaf_strategy() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::Bool),
        any::<f32>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(JsonValue::Number),
        "[ -~]{0,24}"
            .prop_filter("sentinel strings decode as numbers", |s| {
                s != "INFINITY" && s != "NEGINFINITY" && s != "NaN"
            })
            .prop_map(JsonValue::Str),
    ]
}

fn tree_strategy() -> impl Strategy<Value = JsonValue> {
    leaf_strategy().prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(JsonValue::Array),
            prop::collection::vec((key_strategy(), inner), 0..6).prop_map(|fields| {
                // Duplicate keys would reparse into a single field.
                let mut seen = std::collections::HashSet::new();
                let deduped = fields
                    .into_iter()
                    .filter(|(k, _)| seen.insert(k.clone()))
                    .collect();
                JsonValue::Object(deduped)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn stringify_parse_round_trip(tree in tree_strategy()) {
        let compact = tree.stringify();
        prop_assert_eq!(&JsonValue::parse(&compact), &tree);

        let pretty = tree.stringify_pretty();
        prop_assert_eq!(&JsonValue::parse(&pretty), &tree);
    }
}
