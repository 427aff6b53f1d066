//! Conversions between runtime values and host types

use crate::value::{ArrayValue, Value};

/// Conversion from a runtime value into a host type.
///
/// `from_value` returns `None` when the value has no sensible host form;
/// callers decide whether that is a warning or an error.
pub trait FromValue: Sized {
    /// Host type name used in conversion diagnostics
    const EXPECTED: &'static str;

    /// Convert, or `None` if the value does not fit.
    fn from_value(value: &Value) -> Option<Self>;
}

/// Conversion from a host type into a runtime value.
pub trait IntoValue {
    /// Convert.
    fn into_value(self) -> Value;
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) | Value::Long(_) | Value::Double(_) | Value::String(_) => {
                Some(value.to_bool())
            }
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Long(n) => Some(*n),
            Value::Double(d) if d.is_finite() => Some(*d as i64),
            Value::String(s) if s.is_numeric() => Some(s.to_long()),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|n| i32::try_from(n).ok())
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) | Value::Long(_) | Value::Double(_) => Some(value.to_double()),
            Value::String(s) if s.is_numeric() => Some(s.to_double()),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_scalar() {
            Some(value.to_string_value().to_str_lossy().into_owned())
        } else {
            None
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(a) => a.iter().map(|(_, slot)| T::from_value(&slot.get())).collect(),
            Value::Foreign(f) => {
                let array = f.snapshot()?;
                array.values().iter().map(T::from_value).collect()
            }
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "mixed";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Long(i64::from(self))
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Long(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect::<ArrayValue>())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}
