//! Value representation for runtime values

mod array;
mod callable;
mod class;
mod compare;
mod convert;
mod delegate;
mod display;
mod key;
pub mod numeric;
mod object;
mod serialize;
mod string;
mod var;

pub use array::{ArrayValue, Iter};
pub use callable::{
    Body, Callable, Capture, Closure, Function, Invocable, NativeFnPtr, NativeFunction,
    NativeRefFnPtr, Param, UserFunction,
};
pub use class::{ClassBuilder, ClassDef, ClassRegistry, STD_CLASS};
pub use compare::cmp_object;
pub use delegate::{ArrayDelegate, DelegateChain, MethodArrayDelegate, PrintDelegate};
pub use display::{print_r, var_dump, var_export, Dumper};
pub use key::ArrayKey;
pub use numeric::Number;
pub use object::{ObjectRef, ObjectValue};
pub use serialize::{serialize, unserialize};
pub use string::{StringBuilder, StringValue};
pub use var::{Argument, Slot, Var};

use std::sync::Arc;

use crate::foreign::ForeignValue;

/// A runtime value.
///
/// The variant set is closed: scalars are immutable and freely cloned,
/// while arrays, objects and callables are handles. Cloning an array
/// handle is a logical copy (copy-on-write); cloning an object handle
/// aliases the same instance.
#[derive(Clone, Default)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// `null`
    #[default]
    Null,

    /// `true` / `false`
    Bool(bool),

    /// 64-bit integer
    Long(i64),

    /// 64-bit float
    Double(f64),

    /// Binary or unicode string
    String(StringValue),

    // ═══════════════════════════════════════════════════════════════════
    // Handles
    // ═══════════════════════════════════════════════════════════════════
    /// Ordered associative array
    Array(ArrayValue),

    /// Class instance
    Object(ObjectRef),

    /// Function, closure or bound method
    Callable(Callable),

    /// Wrapped host object or host collection
    Foreign(ForeignValue),
}

/// A thread-safe scalar, used where descriptors shared across execution
/// contexts need to hold values (class constants, parameter defaults).
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Long(i64),
    /// Float
    Double(f64),
    /// Unicode string
    String(Arc<str>),
    /// Byte string
    Binary(Arc<[u8]>),
}

impl ConstValue {
    /// Materialize as a runtime value.
    pub fn to_value(&self) -> Value {
        match self {
            ConstValue::Null => Value::Null,
            ConstValue::Bool(b) => Value::Bool(*b),
            ConstValue::Long(n) => Value::Long(*n),
            ConstValue::Double(d) => Value::Double(*d),
            ConstValue::String(s) => Value::String(StringValue::unicode(&**s)),
            ConstValue::Binary(b) => Value::String(StringValue::binary(&**b)),
        }
    }

    /// Capture a scalar runtime value; handles yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(ConstValue::Null),
            Value::Bool(b) => Some(ConstValue::Bool(*b)),
            Value::Long(n) => Some(ConstValue::Long(*n)),
            Value::Double(d) => Some(ConstValue::Double(*d)),
            Value::String(StringValue::Unicode(s)) => Some(ConstValue::String(Arc::from(&**s))),
            Value::String(StringValue::Binary(b)) => Some(ConstValue::Binary(Arc::from(&**b))),
            _ => None,
        }
    }
}

impl From<bool> for ConstValue {
    fn from(b: bool) -> Self {
        ConstValue::Bool(b)
    }
}

impl From<i64> for ConstValue {
    fn from(n: i64) -> Self {
        ConstValue::Long(n)
    }
}

impl From<i32> for ConstValue {
    fn from(n: i32) -> Self {
        ConstValue::Long(i64::from(n))
    }
}

impl From<f64> for ConstValue {
    fn from(d: f64) -> Self {
        ConstValue::Double(d)
    }
}

impl From<&str> for ConstValue {
    fn from(s: &str) -> Self {
        ConstValue::String(Arc::from(s))
    }
}
