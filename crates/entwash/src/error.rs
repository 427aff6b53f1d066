//! Error types for entwash runtime operations

use thiserror::Error;

use crate::value::Value;

/// A catchable, language-level runtime condition.
///
/// The surrounding engine is expected to surface these as exceptions that
/// user code can catch.
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Method lookup failed on a class
    #[error("Call to undefined method {class}::{method}()")]
    UnknownMethod {
        /// Class that was searched
        class: String,
        /// Method name as written by the caller
        method: String,
    },

    /// Class constant lookup failed
    #[error("Undefined constant {class}::{name}")]
    UnknownConstant {
        /// Class that was searched
        class: String,
        /// Constant name
        name: String,
    },

    /// No class with this name is registered
    #[error("Class \"{0}\" not found")]
    UnknownClass(String),

    /// No function with this name is registered
    #[error("Call to undefined function {0}()")]
    UnknownFunction(String),

    /// Two values have no defined ordering
    #[error("Cannot compare {left} with {right}")]
    Incomparable {
        /// Left operand description
        left: String,
        /// Right operand description
        right: String,
    },

    /// A value was used as a function but is not callable
    #[error("Value of type {0} is not callable")]
    NotCallable(String),

    /// Too few arguments for a function
    #[error("Too few arguments to function {name}(), {got} passed and at least {expected} expected")]
    ArityMismatch {
        /// Function name
        name: String,
        /// Required parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// A value could not be converted to a required host type
    #[error("Cannot convert {got} to {expected}")]
    Conversion {
        /// Target type name
        expected: String,
        /// Source value type name
        got: String,
    },

    /// A scalar was used where an array is required
    #[error("Cannot use a scalar value of type {0} as an array")]
    NotAnArray(String),

    /// A non-object was used where an object is required
    #[error("Attempt to assign property on {0}")]
    NotAnObject(String),

    /// An exception object thrown by user code
    #[error("Uncaught exception")]
    Thrown(Value),
}

/// A condition that aborts the whole execution context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// Programming-contract violation, e.g. structural corruption of a
    /// sequence-only host collection
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Call depth exceeded the configured maximum
    #[error("Maximum function nesting level of {max} reached (depth {depth})")]
    StackOverflow {
        /// Current depth
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Execution was interrupted through the context's interrupt flag
    #[error("Execution interrupted")]
    Interrupted,
}

/// Any error produced while running inside an [`Env`](crate::Env).
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Catchable language-level error
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Fatal error
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl EvalError {
    /// Whether user code may catch this error.
    pub fn is_catchable(&self) -> bool {
        matches!(self, EvalError::Runtime(_))
    }

    /// The thrown exception value, if this error carries one.
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            EvalError::Runtime(RuntimeError::Thrown(v)) => Some(v),
            _ => None,
        }
    }
}

/// Malformed input to `unserialize`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnserializeError {
    /// Input ended in the middle of a value
    #[error("Unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Byte offset
        offset: usize,
    },

    /// A structural byte did not match
    #[error("Expected '{expected}' at offset {offset}, found '{found}'")]
    UnexpectedByte {
        /// Byte offset
        offset: usize,
        /// Expected character
        expected: char,
        /// Character found
        found: char,
    },

    /// A number could not be parsed
    #[error("Invalid number at offset {offset}")]
    InvalidNumber {
        /// Byte offset
        offset: usize,
    },

    /// A length prefix does not match the payload
    #[error("Invalid length {length} at offset {offset}")]
    InvalidLength {
        /// Byte offset
        offset: usize,
        /// Declared length
        length: usize,
    },

    /// Unknown type tag
    #[error("Unknown type tag '{tag}' at offset {offset}")]
    UnknownTag {
        /// Byte offset
        offset: usize,
        /// The tag character
        tag: char,
    },

    /// Input continued after a complete value
    #[error("Trailing data at offset {offset}")]
    TrailingData {
        /// Byte offset
        offset: usize,
    },

    /// Arrays and objects nested deeper than the configured limit
    #[error("Nesting deeper than {max} at offset {offset}")]
    TooDeep {
        /// Byte offset of the container that crossed the limit
        offset: usize,
        /// The limit in force
        max: usize,
    },
}

/// Configuration loading error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document was not valid
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Get the PHP-facing type name of a value (as `gettype` reports it).
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "boolean",
        Value::Long(_) => "integer",
        Value::Double(_) => "double",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) | Value::Callable(_) | Value::Foreign(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_is_catchable() {
        let err: EvalError = RuntimeError::UnknownFunction("foo".into()).into();
        assert!(err.is_catchable());
    }

    #[test]
    fn test_fatal_error_is_not_catchable() {
        let err: EvalError = FatalError::Interrupted.into();
        assert!(!err.is_catchable());
    }

    #[test]
    fn test_unknown_method_message_names_class_and_method() {
        let err = RuntimeError::UnknownMethod {
            class: "Foo".into(),
            method: "bar".into(),
        };
        assert_eq!(err.to_string(), "Call to undefined method Foo::bar()");
    }

    #[test]
    fn test_thrown_accessor() {
        let err: EvalError = RuntimeError::Thrown(Value::Long(3)).into();
        assert!(matches!(err.thrown(), Some(Value::Long(3))));
        let other: EvalError = FatalError::Interrupted.into();
        assert!(other.thrown().is_none());
    }
}
