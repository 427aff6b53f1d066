//! Loose equality, strict equality and ordering
//!
//! Loose comparison coerces operands of different kinds:
//!
//! | left \ right     | rule                                              |
//! |------------------|---------------------------------------------------|
//! | null / string    | null is `""`, compare as strings                  |
//! | bool or null     | compare both as booleans                          |
//! | number / number  | numeric                                           |
//! | number / string  | numeric if the string is numeric, else the number's string form against the string |
//! | string / string  | numeric if both are numeric, else bytewise        |
//! | array / array    | count, then value by value for each key of the left side |
//! | object / object  | same class required, then [`cmp_object`]           |
//! | array or object / scalar | the array or object is greater            |

use std::cmp::Ordering;

use super::array::ArrayValue;
use super::numeric::Number;
use super::object::ObjectRef;
use super::string::StringValue;
use super::Value;
use crate::error::{type_name, Result, RuntimeError};

fn incomparable(a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::Incomparable {
        left: describe(a),
        right: describe(b),
    }
}

fn describe(v: &Value) -> String {
    match v {
        Value::Object(o) => format!("object({})", o.class_name()),
        other => type_name(other).to_string(),
    }
}

fn cmp_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Long(x), Number::Long(y)) => Some(x.cmp(&y)),
        (x, y) => x.to_f64().partial_cmp(&y.to_f64()),
    }
}

fn cmp_number_string(n: Number, s: &StringValue) -> Option<Ordering> {
    match s.numeric_kind() {
        Some(sn) => cmp_numbers(n, sn),
        None => {
            let text = Value::from(n).to_string_value();
            Some(text.cmp(s))
        }
    }
}

fn cmp_strings(a: &StringValue, b: &StringValue) -> Option<Ordering> {
    match (a.numeric_kind(), b.numeric_kind()) {
        (Some(x), Some(y)) => cmp_numbers(x, y),
        _ => Some(a.cmp(b)),
    }
}

fn cmp_arrays(a: &ArrayValue, b: &ArrayValue) -> Result<Ordering> {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => {}
        other => return Ok(other),
    }
    for (key, slot) in a.iter() {
        let Some(other) = b.get(key) else {
            return Err(RuntimeError::Incomparable {
                left: "array".to_string(),
                right: "array".to_string(),
            }
            .into());
        };
        match slot.get().try_compare(&other)? {
            Ordering::Equal => {}
            ord => return Ok(ord),
        }
    }
    Ok(Ordering::Equal)
}

/// Structural comparison of two instances of the same class: field count
/// first, then fields sorted by name, comparing names and then values.
pub fn cmp_object(a: &ObjectRef, b: &ObjectRef) -> Result<Ordering> {
    if a.ptr_eq(b) {
        return Ok(Ordering::Equal);
    }
    if !a.class_name().eq_ignore_ascii_case(&b.class_name()) {
        return Err(incomparable(&Value::Object(a.clone()), &Value::Object(b.clone())).into());
    }

    let mut left = a.fields();
    let mut right = b.fields();
    match left.len().cmp(&right.len()) {
        Ordering::Equal => {}
        other => return Ok(other),
    }
    left.sort_by(|x, y| x.0.cmp(&y.0));
    right.sort_by(|x, y| x.0.cmp(&y.0));

    for ((ka, va), (kb, vb)) in left.iter().zip(right.iter()) {
        match ka.cmp(kb) {
            Ordering::Equal => {}
            other => return Ok(other),
        }
        match va.try_compare(vb)? {
            Ordering::Equal => {}
            other => return Ok(other),
        }
    }
    Ok(Ordering::Equal)
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Long(l) => Value::Long(l),
            Number::Double(d) => Value::Double(d),
        }
    }
}

impl Value {
    /// Loose comparison.
    ///
    /// Fails with [`RuntimeError::Incomparable`] for objects of different
    /// classes, arrays whose keys differ, and NaN.
    pub fn try_compare(&self, other: &Value) -> Result<Ordering> {
        use Value::*;

        let ord = match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, String(s)) => Some(StringValue::empty().cmp(s)),
            (String(s), Null) => Some(s.cmp(&StringValue::empty())),
            (Bool(_) | Null, _) | (_, Bool(_) | Null) => {
                Some(self.to_bool().cmp(&other.to_bool()))
            }

            (Long(_) | Double(_), Long(_) | Double(_)) => {
                cmp_numbers(self.to_number(), other.to_number())
            }
            (Long(_) | Double(_), String(s)) => cmp_number_string(self.to_number(), s),
            (String(s), Long(_) | Double(_)) => {
                cmp_number_string(other.to_number(), s).map(Ordering::reverse)
            }
            (String(a), String(b)) => cmp_strings(a, b),

            (Array(a), Array(b)) => return cmp_arrays(a, b),
            (Object(a), Object(b)) => return cmp_object(a, b),
            (Callable(a), Callable(b)) if a.ptr_eq(b) => Some(Ordering::Equal),
            (Foreign(a), Foreign(b)) if a.ptr_eq(b) => Some(Ordering::Equal),

            (Array(_), Object(_) | Callable(_) | Foreign(_)) => Some(Ordering::Less),
            (Object(_) | Callable(_) | Foreign(_), Array(_)) => Some(Ordering::Greater),
            (Array(_) | Object(_) | Callable(_) | Foreign(_), _) if other.is_scalar() => {
                Some(Ordering::Greater)
            }
            (_, Array(_) | Object(_) | Callable(_) | Foreign(_)) if self.is_scalar() => {
                Some(Ordering::Less)
            }
            _ => None,
        };
        ord.ok_or_else(|| incomparable(self, other).into())
    }

    /// Total loose ordering: incomparable pairs order as `Greater`.
    pub fn compare(&self, other: &Value) -> Ordering {
        self.try_compare(other).unwrap_or(Ordering::Greater)
    }

    /// Loose equality (`==`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        matches!(self.try_compare(other), Ok(Ordering::Equal))
    }

    /// Strict equality (`===`): same kind and same value. Arrays must
    /// hold strictly equal pairs in the same order; objects and other
    /// handles must be the same instance.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, sa), (kb, sb))| {
                        ka == kb && sa.get().strict_eq(&sb.get())
                    })
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Foreign(a), Value::Foreign(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_vs_lexicographic_branch() {
        // numeric string against number: numeric
        assert!(Value::Long(10).loose_eq(&Value::from("1e1")));
        assert!(Value::Long(10).loose_eq(&Value::from(" 10")));
        // non-numeric string against number: string comparison
        assert!(!Value::Long(0).loose_eq(&Value::from("abc")));
        assert!(!Value::Long(10).loose_eq(&Value::from("10abc")));
        assert!(Value::Long(10).loose_eq(&Value::from("10")));
    }

    #[test]
    fn test_string_pairs() {
        assert!(Value::from("1e3").loose_eq(&Value::from("1000")));
        assert!(Value::from("10").loose_eq(&Value::from("010")));
        assert!(!Value::from("abc").loose_eq(&Value::from("ABC")));
        assert_eq!(
            Value::from("10").compare(&Value::from("9")),
            Ordering::Greater
        );
        assert_eq!(
            Value::from("10a").compare(&Value::from("9a")),
            Ordering::Less
        );
    }

    #[test]
    fn test_null_rules() {
        assert!(Value::Null.loose_eq(&Value::Long(0)));
        assert!(Value::Null.loose_eq(&Value::from("")));
        assert!(!Value::Null.loose_eq(&Value::from("0")));
        assert!(Value::Null.loose_eq(&Value::empty_array()));
        assert!(Value::Null.loose_eq(&Value::Bool(false)));
    }

    #[test]
    fn test_nan_is_never_equal() {
        let nan = Value::Double(f64::NAN);
        assert!(!nan.loose_eq(&nan));
        assert!(!nan.strict_eq(&nan));
        assert!(nan.try_compare(&Value::Long(1)).is_err());
    }

    #[test]
    fn test_strict_eq_distinguishes_kinds() {
        assert!(!Value::Long(1).strict_eq(&Value::Double(1.0)));
        assert!(Value::Long(1).loose_eq(&Value::Double(1.0)));
        assert!(!Value::Long(1).strict_eq(&Value::from("1")));
        assert!(Value::binary("ab").strict_eq(&Value::string("ab")));
    }

    #[test]
    fn test_array_loose_ignores_order_strict_does_not() {
        let a: ArrayValue = vec![("x", Value::Long(1)), ("y", Value::Long(2))]
            .into_iter()
            .collect();
        let b: ArrayValue = vec![("y", Value::Long(2)), ("x", Value::from("1"))]
            .into_iter()
            .collect();
        assert!(Value::Array(a.clone()).loose_eq(&Value::Array(b.clone())));
        assert!(!Value::Array(a).strict_eq(&Value::Array(b)));
    }

    #[test]
    fn test_array_orders_by_count() {
        let small = Value::list([Value::Long(9)]);
        let big = Value::list([Value::Long(1), Value::Long(1)]);
        assert_eq!(small.compare(&big), Ordering::Less);
    }

    #[test]
    fn test_array_greater_than_scalar() {
        assert_eq!(
            Value::list([Value::Long(1)]).compare(&Value::Long(100)),
            Ordering::Greater
        );
    }
}
