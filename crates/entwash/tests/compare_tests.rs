//! Loose and strict comparison tests

mod common;

use std::cmp::Ordering;

use entwash::*;

fn s(text: &str) -> Value {
    Value::from(text)
}

// ═══════════════════════════════════════════════════════════════════════
// Loose Equality Table
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_loose_equality_table() {
    common::init_tracing();
    let cases: Vec<(Value, Value, bool)> = vec![
        (Value::Bool(true), s("1"), true),
        (Value::Bool(false), s(""), true),
        (Value::Bool(false), s("0"), true),
        (Value::Bool(true), s("abc"), true),
        (Value::Long(0), s("abc"), false),
        (Value::Long(1), s("1.0"), true),
        (Value::Long(10), s("1e1"), true),
        (Value::Double(1.5), s("1.5"), true),
        (s("10"), s("010"), true),
        (s("abc"), s("ABC"), false),
        (Value::Null, Value::Long(0), true),
        (Value::Null, s("0"), false),
        (Value::Null, s(""), true),
        (Value::Null, Value::Bool(false), true),
        (Value::Null, Value::empty_array(), true),
        (Value::Long(1), Value::Double(1.0), true),
    ];
    for (a, b, expected) in cases {
        assert_eq!(a.loose_eq(&b), expected, "{:?} == {:?}", a, b);
        assert_eq!(b.loose_eq(&a), expected, "{:?} == {:?}", b, a);
    }
}

#[test]
fn test_strict_equality_checks_kind() {
    assert!(!Value::Long(1).strict_eq(&s("1")));
    assert!(!Value::Long(1).strict_eq(&Value::Double(1.0)));
    assert!(Value::binary("k").strict_eq(&Value::string("k")));
    assert!(!Value::Null.strict_eq(&Value::Bool(false)));
}

#[test]
fn test_nan_is_never_equal() {
    let nan = Value::Double(f64::NAN);
    assert!(!nan.loose_eq(&nan));
    assert!(!nan.strict_eq(&nan));
    assert!(nan.try_compare(&Value::Long(0)).is_err());
}

#[test]
fn test_numeric_string_ordering() {
    assert_eq!(s("9").compare(&s("10")), Ordering::Less);
    assert_eq!(s("abc").compare(&s("abd")), Ordering::Less);
    assert_eq!(Value::Long(5).compare(&s("10")), Ordering::Less);
}

// ═══════════════════════════════════════════════════════════════════════
// Arrays
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_array_count_decides_first() {
    let short = Value::list([Value::Long(100)]);
    let long = Value::list([Value::Long(1), Value::Long(2)]);
    assert_eq!(short.compare(&long), Ordering::Less);
}

#[test]
fn test_array_loose_vs_strict_order() {
    let mut a = ArrayValue::new();
    a.put("x", Value::Long(1));
    a.put("y", Value::Long(2));
    let mut b = ArrayValue::new();
    b.put("y", s("2"));
    b.put("x", s("1"));
    let (a, b) = (Value::Array(a), Value::Array(b));

    assert!(a.loose_eq(&b));
    assert!(!a.strict_eq(&b));
}

#[test]
fn test_arrays_with_different_keys_are_incomparable() {
    let mut a = ArrayValue::new();
    a.put("x", Value::Long(1));
    let mut b = ArrayValue::new();
    b.put("y", Value::Long(1));
    let (a, b) = (Value::Array(a), Value::Array(b));

    assert!(a.try_compare(&b).is_err());
    assert!(!a.loose_eq(&b));
}

#[test]
fn test_array_is_greater_than_scalar() {
    assert_eq!(Value::empty_array().compare(&Value::Long(100)), Ordering::Greater);
}

// ═══════════════════════════════════════════════════════════════════════
// Objects
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_object_field_order_does_not_matter() {
    let mut env = Env::new();
    let a = env.new_std_object();
    a.put_field("x", Value::Long(1));
    a.put_field("y", Value::Long(2));
    let b = env.new_std_object();
    b.put_field("y", Value::Long(2));
    b.put_field("x", Value::Long(1));

    assert_eq!(cmp_object(&a, &b).unwrap(), Ordering::Equal);
    let (va, vb) = (Value::Object(a), Value::Object(b));
    assert!(va.loose_eq(&vb));
    assert!(!va.strict_eq(&vb));
}

#[test]
fn test_object_field_count_decides_first() {
    let mut env = Env::new();
    let a = env.new_std_object();
    a.put_field("z", Value::Long(9));
    let b = env.new_std_object();
    b.put_field("a", Value::Long(0));
    b.put_field("b", Value::Long(0));

    assert_eq!(cmp_object(&a, &b).unwrap(), Ordering::Less);
}

#[test]
fn test_objects_of_different_classes_are_incomparable() {
    let mut env = Env::new();
    env.define_class(ClassBuilder::new("Point").build());
    let p = env.new_object("Point", &[]).unwrap();
    let o = env.new_std_object();

    assert!(cmp_object(&p, &o).is_err());
    let (vp, vo) = (Value::Object(p), Value::Object(o));
    assert!(!vp.loose_eq(&vo));
    assert_eq!(vp.compare(&vo), Ordering::Greater);
}

#[test]
fn test_same_instance_is_strict_equal() {
    let mut env = Env::new();
    let obj = Value::Object(env.new_std_object());
    let alias = obj.clone();
    assert!(obj.strict_eq(&alias));
    assert_eq!(obj, alias);
}
