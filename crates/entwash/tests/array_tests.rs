//! Array storage, copy-on-write and cursor tests

mod common;

use common::{as_longs, init_tracing, longs};
use entwash::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ═══════════════════════════════════════════════════════════════════════
// Copy-on-Write Isolation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_copy_then_append_is_isolated() {
    init_tracing();
    let a = longs(&[1, 2, 3]);
    let mut b = a.clone();
    assert!(a.is_shared());

    b.append(Value::Long(4));

    assert_eq!(as_longs(&a), vec![1, 2, 3]);
    assert_eq!(as_longs(&b), vec![1, 2, 3, 4]);
    assert!(!a.is_shared());
}

#[test]
fn test_copy_then_overwrite_is_isolated() {
    let mut a = longs(&[1, 2, 3]);
    let b = a.clone();
    a.put(1, Value::Long(20));
    assert_eq!(as_longs(&a), vec![1, 20, 3]);
    assert_eq!(as_longs(&b), vec![1, 2, 3]);
}

#[test]
fn test_copy_then_remove_is_isolated() {
    let a = longs(&[1, 2, 3]);
    let mut b = a.clone();
    b.remove(0);
    assert_eq!(a.len(), 3);
    assert_eq!(b.keys(), vec![ArrayKey::Int(1), ArrayKey::Int(2)]);
}

#[test]
fn test_nested_mutation_does_not_leak_into_copy() {
    let mut outer = ArrayValue::new();
    outer.put("inner", Value::Array(longs(&[1])));
    let snapshot = outer.clone();

    outer
        .with_array("inner", |inner| {
            inner.append(Value::Long(2));
        })
        .unwrap();

    let inner_now = outer.get("inner").unwrap();
    let inner_then = snapshot.get("inner").unwrap();
    assert_eq!(as_longs(inner_now.as_array().unwrap()), vec![1, 2]);
    assert_eq!(as_longs(inner_then.as_array().unwrap()), vec![1]);
}

#[test]
fn test_value_copy_of_array_value() {
    let v = Value::Array(longs(&[5]));
    let mut copy = v.copy();
    copy.as_array_mut().unwrap().append(Value::Long(6));
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(copy.as_array().unwrap().len(), 2);
}

// ═══════════════════════════════════════════════════════════════════════
// References
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_reference_aliasing_between_arrays() {
    let mut a = ArrayValue::new();
    a.put("k", Value::Long(1));
    let var_a = a.get_ref("k");

    let mut b = ArrayValue::new();
    b.put_ref("k", var_a.clone());

    var_a.set(Value::Long(99));
    assert_eq!(b.get("k"), Some(Value::Long(99)));
    assert_eq!(a.get("k"), Some(Value::Long(99)));

    // writing through the array writes through the cell
    b.put("k", Value::Long(7));
    assert_eq!(a.get("k"), Some(Value::Long(7)));
}

#[test]
fn test_reference_survives_copy() {
    let mut a = ArrayValue::new();
    let var = a.get_ref("r");
    let b = a.clone();
    var.set(Value::from("shared"));
    assert_eq!(b.get("r"), Some(Value::from("shared")));
}

#[test]
fn test_deep_copy_breaks_references() {
    let mut a = ArrayValue::new();
    let var = a.get_ref("r");
    let copy = a.deep_copy();
    var.set(Value::Long(1));
    assert_eq!(copy.get("r"), Some(Value::Null));
}

#[test]
fn test_get_arg_by_ref_creates_entry() {
    let mut a = ArrayValue::new();
    let arg = a.get_arg("new", true);
    arg.as_var().unwrap().set(Value::Long(3));
    assert_eq!(a.get("new"), Some(Value::Long(3)));

    let by_value = a.get_arg("other", false);
    assert!(by_value.as_var().is_none());
    assert!(!a.contains_key("other"));
}

// ═══════════════════════════════════════════════════════════════════════
// Keys
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_tail_key_is_monotonic() {
    let mut a = longs(&[10, 20, 30]);
    assert_eq!(a.keys(), vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::Int(2)]);

    a.remove(2);
    let key = a.append(Value::Long(40));
    assert_eq!(key, ArrayKey::Int(3));
}

#[test]
fn test_pop_recomputes_tail_key() {
    let mut a = longs(&[10, 20, 30]);
    assert_eq!(a.pop(), Some(Value::Long(30)));
    assert_eq!(a.append(Value::Long(99)), ArrayKey::Int(2));
}

#[test]
fn test_explicit_key_moves_tail() {
    let mut a = ArrayValue::new();
    a.put(10, Value::Null);
    assert_eq!(a.append(Value::Null), ArrayKey::Int(11));
    a.put(-5, Value::Null);
    assert_eq!(a.append(Value::Null), ArrayKey::Int(12));
}

#[test]
fn test_integer_strings_become_integer_keys() {
    let mut a = ArrayValue::new();
    a.put("5", Value::from("int"));
    a.put("05", Value::from("str"));
    assert_eq!(a.get(5), Some(Value::from("int")));
    assert_eq!(a.keys(), vec![ArrayKey::Int(5), ArrayKey::from("05")]);
}

#[test]
fn test_unicode_and_binary_keys_collide() {
    let mut a = ArrayValue::new();
    a.put(ArrayKey::from(StringValue::binary("k")), Value::Long(1));
    a.put(ArrayKey::from(StringValue::unicode("k")), Value::Long(2));
    assert_eq!(a.len(), 1);
    assert_eq!(a.get("k"), Some(Value::Long(2)));
}

// ═══════════════════════════════════════════════════════════════════════
// Cursor
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_cursor_walk() {
    let mut a = longs(&[1, 2, 3]);
    assert_eq!(a.current(), Some(Value::Long(1)));
    assert_eq!(a.next(), Some(Value::Long(2)));
    assert_eq!(a.key(), Some(ArrayKey::Int(1)));
    assert_eq!(a.end(), Some(Value::Long(3)));
    assert_eq!(a.next(), None);
    assert_eq!(a.prev(), None);
    assert_eq!(a.reset(), Some(Value::Long(1)));
}

#[test]
fn test_each_returns_pair_then_none() {
    let mut a = ArrayValue::new();
    a.put("x", Value::Long(1));

    let pair = a.each().unwrap();
    assert_eq!(pair.get(0), Some(Value::from("x")));
    assert_eq!(pair.get("key"), Some(Value::from("x")));
    assert_eq!(pair.get(1), Some(Value::Long(1)));
    assert_eq!(pair.get("value"), Some(Value::Long(1)));
    assert!(a.each().is_none());
}

#[test]
fn test_remove_under_cursor_advances() {
    let mut a = longs(&[1, 2, 3]);
    a.next();
    a.remove(1);
    assert_eq!(a.current(), Some(Value::Long(3)));
}

// ═══════════════════════════════════════════════════════════════════════
// Whole-Array Operations
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_shuffle_with_fixed_picker() {
    let mut a = longs(&[10, 20, 30, 40, 50]);
    a.shuffle_with(|_| 0);
    assert_eq!(as_longs(&a), vec![20, 30, 40, 50, 10]);
    assert_eq!(
        a.keys(),
        (0..5).map(ArrayKey::Int).collect::<Vec<_>>()
    );
}

#[test]
fn test_seeded_shuffle_is_reproducible() {
    let shuffled = |seed| {
        let mut a = longs(&[10, 20, 30, 40, 50]);
        a.shuffle(&mut StdRng::seed_from_u64(seed));
        as_longs(&a)
    };
    let first = shuffled(7);
    assert_eq!(first, shuffled(7));

    let mut sorted = first.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![10, 20, 30, 40, 50]);
}

#[test]
fn test_unshift_renumbers() {
    let mut a = ArrayValue::new();
    a.put(5, Value::Long(1));
    a.put("s", Value::Long(2));
    a.unshift(Value::Long(0));
    assert_eq!(
        a.keys(),
        vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::from("s")]
    );
}

#[test]
fn test_sort_by_value() {
    let mut a = longs(&[3, 1, 2]);
    a.sort_by(|(_, x), (_, y)| x.compare(y), true);
    assert_eq!(as_longs(&a), vec![1, 2, 3]);
    assert_eq!(a.keys(), vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::Int(2)]);
}

#[test]
fn test_union_keeps_left_entries() {
    let left = longs(&[1, 2]);
    let right = longs(&[9, 9, 3]);
    assert_eq!(as_longs(&left.union(&right)), vec![1, 2, 3]);
}

#[test]
fn test_contains_loose_and_strict() {
    let a: ArrayValue = vec![Value::from("1"), Value::Long(2)].into_iter().collect();
    assert_eq!(a.contains(&Value::Long(1)), Some(ArrayKey::Int(0)));
    assert_eq!(a.contains_strict(&Value::Long(1)), None);
    assert_eq!(a.contains_strict(&Value::Long(2)), Some(ArrayKey::Int(1)));
}

// ═══════════════════════════════════════════════════════════════════════
// Autovivification
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_nested_array_autovivification() {
    let mut root = Value::Null;
    root.as_array_viv()
        .unwrap()
        .with_array("a", |a| {
            a.append(Value::Long(1));
        })
        .unwrap();
    let inner = root.as_array().unwrap().get("a").unwrap();
    assert_eq!(as_longs(inner.as_array().unwrap()), vec![1]);
}

#[test]
fn test_autovivification_refuses_scalars() {
    let mut v = Value::Long(1);
    assert!(v.as_array_viv().is_err());
    let mut s = Value::from("text");
    assert!(s.as_array_viv().is_err());
}

#[test]
fn test_object_autovivification_warns() {
    let mut env = Env::new();
    let mut a = ArrayValue::new();
    let obj = a.get_object(&mut env, "o").unwrap();
    obj.put_field("x", Value::Long(1));

    assert_eq!(env.warnings().len(), 1);
    let stored = a.get("o").unwrap();
    assert!(stored.as_object().unwrap().ptr_eq(&obj));
}
