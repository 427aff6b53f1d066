//! Value constructors, predicates, conversions and From impls

use super::array::{ArrayValue, CopyMap};
use super::key::ArrayKey;
use super::numeric::{format_double, Number};
use super::object::ObjectRef;
use super::string::StringValue;
use super::*;
use crate::environment::Env;
use crate::error::{type_name, Result, RuntimeError};

// ═══════════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════════

impl Value {
    /// Create a unicode string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(StringValue::unicode(s))
    }

    /// Create a byte string value.
    pub fn binary(b: impl AsRef<[u8]>) -> Self {
        Value::String(StringValue::binary(b))
    }

    /// Create an empty array value.
    pub fn empty_array() -> Self {
        Value::Array(ArrayValue::new())
    }

    /// Create a list value keyed `0..n`.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(ArrayValue::from_values(items))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// Check if value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is boolean.
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Check if value is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Check if value is an object (including wrapped host objects).
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Foreign(_))
    }

    /// Check if value is callable as-is.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callable(_))
    }

    /// Integer, float, or numeric string.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Long(_) | Value::Double(_) => true,
            Value::String(s) => s.is_numeric(),
            _ => false,
        }
    }

    /// Check if value is null or bool or number or string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Long(_) | Value::Double(_) | Value::String(_)
        )
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors (return Option for safe access)
    // ═══════════════════════════════════════════════════════════════════

    /// Borrow the array.
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the array mutably.
    pub fn as_array_mut(&mut self) -> Option<&mut ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the object handle.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow the string.
    pub fn as_string(&self) -> Option<&StringValue> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Total Conversions
    // ═══════════════════════════════════════════════════════════════════

    /// Truthiness.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Long(n) => *n != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => s.to_bool(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(_) | Value::Callable(_) => true,
            Value::Foreign(f) => f.to_bool(),
        }
    }

    /// Integer conversion; strings use their numeric prefix.
    pub fn to_long(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => i64::from(*b),
            Value::Long(n) => *n,
            // saturating, NaN becomes 0
            Value::Double(d) => *d as i64,
            Value::String(s) => s.to_long(),
            Value::Array(a) => i64::from(!a.is_empty()),
            Value::Object(_) | Value::Callable(_) | Value::Foreign(_) => 1,
        }
    }

    /// Float conversion; strings use their numeric prefix.
    pub fn to_double(&self) -> f64 {
        match self {
            Value::Double(d) => *d,
            Value::String(s) => s.to_double(),
            other => other.to_long() as f64,
        }
    }

    /// Numeric value for arithmetic and comparison.
    pub fn to_number(&self) -> Number {
        match self {
            Value::Double(d) => Number::Double(*d),
            Value::String(s) => match s.numeric_kind() {
                Some(n) => n,
                None if s.as_bytes().iter().any(|b| matches!(b, b'.' | b'e' | b'E')) => {
                    Number::Double(s.to_double())
                }
                None => Number::Long(s.to_long()),
            },
            other => Number::Long(other.to_long()),
        }
    }

    /// String conversion.
    ///
    /// Objects convert to `"Object"` here; use
    /// [`ObjectRef::to_string_env`] to run `__toString`.
    pub fn to_string_value(&self) -> StringValue {
        match self {
            Value::Null | Value::Bool(false) => StringValue::empty(),
            Value::Bool(true) => StringValue::binary("1"),
            Value::Long(n) => StringValue::binary(n.to_string()),
            Value::Double(d) => StringValue::binary(format_double(*d)),
            Value::String(s) => s.clone(),
            Value::Array(_) => StringValue::binary("Array"),
            Value::Object(_) => StringValue::binary("Object"),
            Value::Callable(_) => StringValue::binary("Closure"),
            Value::Foreign(f) => StringValue::binary(f.class_name()),
        }
    }

    /// Array key conversion. Total: handles fall back to their string form.
    pub fn to_key(&self) -> ArrayKey {
        self.try_key()
            .unwrap_or_else(|| ArrayKey::from_string(self.to_string_value()))
    }

    /// Array key conversion for legal key types only: null, bools,
    /// numbers and strings.
    pub fn try_key(&self) -> Option<ArrayKey> {
        match self {
            Value::Null => Some(ArrayKey::Str(StringValue::empty())),
            Value::Bool(b) => Some(ArrayKey::Int(i64::from(*b))),
            Value::Long(n) => Some(ArrayKey::Int(*n)),
            Value::Double(d) => Some(ArrayKey::Int(d.trunc() as i64)),
            Value::String(s) => Some(ArrayKey::from_string(s.clone())),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Copies
    // ═══════════════════════════════════════════════════════════════════

    /// Value-semantics copy (assignment, by-value argument).
    ///
    /// Arrays share storage until written; host collections are
    /// snapshotted into plain arrays; objects stay aliased.
    pub fn copy(&self) -> Value {
        match self {
            Value::Foreign(f) => f.copy(),
            other => other.clone(),
        }
    }

    /// Fully independent copy for crossing an execution-context boundary.
    pub fn deep_copy(&self) -> Value {
        self.deep_copy_with(&mut CopyMap::default())
    }

    pub(crate) fn deep_copy_with(&self, map: &mut CopyMap) -> Value {
        match self {
            Value::Array(a) => Value::Array(a.deep_copy_with(map)),
            Value::Object(o) => Value::Object(o.deep_copy_with(map)),
            Value::Foreign(f) => f.copy(),
            other => other.clone(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Autovivification
    // ═══════════════════════════════════════════════════════════════════

    fn is_vivifiable(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// This slot as an array, replacing null/false/"" with a new array.
    pub fn as_array_viv(&mut self) -> Result<&mut ArrayValue> {
        if self.is_vivifiable() {
            *self = Value::Array(ArrayValue::new());
        }
        match self {
            Value::Array(a) => Ok(a),
            other => Err(RuntimeError::NotAnArray(type_name(other).to_string()).into()),
        }
    }

    /// This slot as an object, replacing null/false/"" with a new
    /// `stdClass` instance (with a warning).
    pub fn as_object_viv(&mut self, env: &mut Env) -> Result<ObjectRef> {
        if self.is_vivifiable() {
            env.warn("Creating default object from empty value");
            *self = Value::Object(env.new_std_object());
        }
        match self {
            Value::Object(o) => Ok(o.clone()),
            other => Err(RuntimeError::NotAnObject(type_name(other).to_string()).into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Long(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(StringValue::unicode(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(StringValue::from(s))
    }
}

impl From<StringValue> for Value {
    fn from(s: StringValue) -> Self {
        Value::String(s)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl From<ArrayKey> for Value {
    fn from(k: ArrayKey) -> Self {
        match k {
            ArrayKey::Int(n) => Value::Long(n),
            ArrayKey::Str(s) => Value::String(s),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
