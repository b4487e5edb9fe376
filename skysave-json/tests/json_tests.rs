use pretty_assertions::assert_eq;
use skysave_json::JsonValue;

#[test]
fn non_finite_sentinels_round_trip() {
    let mut obj = JsonValue::object();
    obj.add_field("pos", JsonValue::Number(f32::INFINITY));
    obj.add_field("neg", JsonValue::Number(f32::NEG_INFINITY));
    obj.add_field("nan", JsonValue::Number(f32::NAN));

    let text = obj.stringify();
    assert_eq!(text, r#"{"pos":"INFINITY","neg":"NEGINFINITY","nan":"NaN"}"#);

    let back = JsonValue::parse(&text);
    assert_eq!(back.field("pos").and_then(JsonValue::as_f32), Some(f32::INFINITY));
    assert_eq!(
        back.field("neg").and_then(JsonValue::as_f32),
        Some(f32::NEG_INFINITY)
    );
    assert!(back.field("nan").and_then(JsonValue::as_f32).unwrap().is_nan());
}

#[test]
fn parsed_field_order_matches_document_order() {
    let parsed = JsonValue::parse(r#"{"z":1,"m":2,"a":3}"#);
    assert_eq!(parsed.stringify(), r#"{"z":1,"m":2,"a":3}"#);
}

#[test]
fn numbers_narrow_to_single_precision() {
    let parsed = JsonValue::parse(r#"{"v":1.00000001}"#);
    // 1.00000001 is not representable as f32 and collapses to 1.0.
    assert_eq!(parsed.field("v").and_then(JsonValue::as_f32), Some(1.0));
}

#[test]
fn baked_fragment_is_emitted_verbatim() {
    let mut obj = JsonValue::object();
    obj.add_field("raw", JsonValue::Baked("{\"pre\":true}".to_owned()));
    assert_eq!(obj.stringify(), r#"{"raw":{"pre":true}}"#);
}

#[test]
fn pretty_output_reparses_to_same_tree() {
    let mut inner = JsonValue::array();
    inner.push(JsonValue::Number(1.0));
    inner.push(JsonValue::Str("two".to_owned()));
    let mut obj = JsonValue::object();
    obj.add_field("list", inner);
    obj.add_field("flag", JsonValue::Bool(true));

    let pretty = obj.stringify_pretty();
    assert!(pretty.contains('\n'));
    assert_eq!(JsonValue::parse(&pretty), obj);
}

#[test]
fn string_escapes_round_trip() {
    let mut obj = JsonValue::object();
    obj.add_field("s", JsonValue::Str("a\"b\\c\nd".to_owned()));
    let back = JsonValue::parse(&obj.stringify());
    assert_eq!(back.field("s").and_then(JsonValue::as_str), Some("a\"b\\c\nd"));
}

#[test]
fn lenient_parse_accepts_bare_fragments() {
    // The lenient mode tolerates documents that are not objects or arrays.
    assert_eq!(JsonValue::parse("true"), JsonValue::Bool(true));
    assert_eq!(JsonValue::parse("3.5"), JsonValue::Number(3.5));
    assert_eq!(JsonValue::parse("\"hi\""), JsonValue::Str("hi".to_owned()));
}

#[test]
fn remove_field_reports_presence() {
    let mut obj = JsonValue::object();
    obj.add_field("keep", JsonValue::Number(1.0));
    obj.add_field("drop", JsonValue::Number(2.0));
    assert!(obj.remove_field("drop"));
    assert!(!obj.remove_field("drop"));
    assert_eq!(obj.stringify(), r#"{"keep":1}"#);
}
