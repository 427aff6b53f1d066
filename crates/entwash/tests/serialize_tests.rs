//! Serialization format tests

mod common;

use entwash::*;
use pretty_assertions::assert_eq;

fn text(value: &Value) -> String {
    String::from_utf8(serialize(value)).unwrap()
}

fn round_trip(env: &mut Env, value: &Value) -> Value {
    unserialize(env, &serialize(value)).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
// Scalars
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scalars_survive_strictly() {
    common::init_tracing();
    let mut env = Env::new();
    let values = [
        Value::Null,
        Value::Bool(false),
        Value::Long(i64::MIN),
        Value::Double(-2.25),
        Value::Double(f64::INFINITY),
        Value::string("snow ❄"),
        Value::binary(b"\x00\xff"),
    ];
    for value in &values {
        let back = round_trip(&mut env, value);
        assert!(back.strict_eq(value), "{:?} came back as {:?}", value, back);
    }
}

#[test]
fn test_nan_survives() {
    let mut env = Env::new();
    let back = round_trip(&mut env, &Value::Double(f64::NAN));
    assert!(matches!(back, Value::Double(d) if d.is_nan()));
}

#[test]
fn test_string_kind_is_preserved() {
    let mut env = Env::new();
    let unicode = round_trip(&mut env, &Value::string("é"));
    let binary = round_trip(&mut env, &Value::binary("é"));
    assert!(unicode.as_string().unwrap().is_unicode());
    assert!(!binary.as_string().unwrap().is_unicode());
    assert_eq!(text(&Value::binary("é")), "s:2:\"é\";");
}

// ═══════════════════════════════════════════════════════════════════════
// Arrays and Objects
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_nested_array_round_trip() {
    let mut env = Env::new();
    let mut inner = ArrayValue::new();
    inner.put("deep", Value::Long(3));
    let mut outer = ArrayValue::new();
    outer.put(5, Value::Array(inner));
    outer.put("name", Value::string("x"));
    let value = Value::Array(outer);

    assert_eq!(
        text(&value),
        "a:2:{i:5;a:1:{U:4:\"deep\";i:3;}U:4:\"name\";U:1:\"x\";}"
    );
    let back = round_trip(&mut env, &value);
    assert!(back.strict_eq(&value));
    assert_eq!(back.as_array().unwrap().next_index(), 6);
}

#[test]
fn test_references_are_written_by_value() {
    let mut a = ArrayValue::new();
    let var = a.get_ref(0);
    var.set(Value::Long(9));
    assert_eq!(text(&Value::Array(a)), "a:1:{i:0;i:9;}");
}

#[test]
fn test_object_round_trip_keeps_class_and_fields() {
    let mut env = Env::new();
    env.define_class(ClassBuilder::new("Point").field("x", 0).field("y", 0).build());
    let p = env.new_object("Point", &[]).unwrap();
    p.put_field("x", Value::Long(3));

    let bytes = serialize(&Value::Object(p.clone()));
    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        "O:5:\"Point\":2:{s:1:\"x\";i:3;s:1:\"y\";i:0;}"
    );

    let back = unserialize(&mut env, &bytes).unwrap();
    let obj = back.as_object().unwrap();
    assert_eq!(obj.class_name(), "Point");
    assert!(!obj.ptr_eq(&p));
    assert!(back.loose_eq(&Value::Object(p)));
}

#[test]
fn test_unknown_class_is_defined_on_demand() {
    let mut env = Env::new();
    assert!(env.lookup_class("Ghost").is_err());
    let back = unserialize(&mut env, b"O:5:\"Ghost\":1:{s:1:\"a\";b:1;}").unwrap();
    let obj = back.as_object().unwrap();
    assert_eq!(obj.class_name(), "Ghost");
    assert_eq!(obj.get_field("a"), Some(Value::Bool(true)));
    assert!(env.lookup_class("ghost").is_ok());
}

#[test]
fn test_cycle_is_cut() {
    let mut env = Env::new();
    let obj = env.new_std_object();
    obj.put_field("me", Value::Object(obj.clone()));
    assert_eq!(
        text(&Value::Object(obj)),
        "O:8:\"stdClass\":1:{s:2:\"me\";N;}"
    );
}

#[test]
fn test_callable_is_written_as_null() {
    common::init_tracing();
    let f = Callable::from(NativeFunction::new("f", 0, |_, _| Ok(Value::Null)));
    assert_eq!(text(&Value::Callable(f)), "N;");
}

// ═══════════════════════════════════════════════════════════════════════
// Malformed Input
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_malformed_input_reports_offsets() {
    let mut env = Env::new();
    let cases: Vec<(&[u8], UnserializeError)> = vec![
        (b"", UnserializeError::UnexpectedEof { offset: 0 }),
        (b"i:12", UnserializeError::UnexpectedEof { offset: 4 }),
        (b"i:x;", UnserializeError::InvalidNumber { offset: 2 }),
        (b"b:2;", UnserializeError::InvalidNumber { offset: 2 }),
        (b"q:1;", UnserializeError::UnknownTag { offset: 0, tag: 'q' }),
        (b"s:9:\"ab\";", UnserializeError::InvalidLength { offset: 4, length: 9 }),
        (b"N;N;", UnserializeError::TrailingData { offset: 2 }),
        (
            b"a:1:{i:0;N;",
            UnserializeError::UnexpectedEof { offset: 11 },
        ),
    ];
    for (input, expected) in cases {
        let err = unserialize(&mut env, input).unwrap_err();
        assert_eq!(err, expected, "input {:?}", String::from_utf8_lossy(input));
    }
}

#[test]
fn test_failed_parse_allocates_nothing() {
    let mut env = Env::new();
    let classes_before = env.classes().len();
    let next_id = env.next_object_id();

    assert!(unserialize(&mut env, b"a:2:{i:0;O:3:\"Foo\":0:{}i:1;").is_err());

    assert_eq!(env.classes().len(), classes_before);
    assert_eq!(env.next_object_id(), next_id + 1);
}

#[test]
fn test_unserialize_builtin_warns() {
    let mut env = Env::new();
    let ok = env
        .call_function("unserialize", &[Value::from("i:5;")])
        .unwrap();
    assert_eq!(ok, Value::Long(5));

    let bad = env
        .call_function("unserialize", &[Value::from("i:5")])
        .unwrap();
    assert_eq!(bad, Value::Bool(false));
    let warnings = env.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.starts_with("unserialize(): "));
}

#[test]
fn test_deep_nesting_is_rejected_not_overflowed() {
    let mut env = Env::new();
    let levels = 200_000;
    let mut input = "a:1:{i:0;".repeat(levels);
    input.push_str("N;");
    input.push_str(&"}".repeat(levels));

    let err = unserialize(&mut env, input.as_bytes()).unwrap_err();
    assert_eq!(err, UnserializeError::TooDeep { offset: 512 * 9, max: 512 });
}

#[test]
fn test_nesting_limit_comes_from_config() {
    let mut env = Env::with_config(EnvConfig::new().with_max_unserialize_depth(2));
    let two = unserialize(&mut env, b"a:1:{i:0;a:0:{}}").unwrap();
    assert_eq!(two.as_array().unwrap().len(), 1);

    let err = unserialize(&mut env, b"a:1:{i:0;O:8:\"stdClass\":1:{s:1:\"x\";a:0:{}}}").unwrap_err();
    assert_eq!(err, UnserializeError::TooDeep { offset: 35, max: 2 });
}
