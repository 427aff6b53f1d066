//! # Entwash
//!
//! The value model and array/object runtime of a dynamic-language
//! interpreter: loosely typed values with the language's coercion and
//! comparison rules, ordered copy-on-write arrays with an internal cursor,
//! reference cells, objects and classes, callables and closures, a bridge
//! to Rust host types, and the tagged serialization format.
//!
//! ## Architecture
//!
//! - **Values**: the closed [`Value`] enum; scalars are immutable, arrays
//!   copy on write, objects are shared handles
//! - **Context**: [`Env`] carries everything a run needs (variable
//!   frames, call depth, registries, RNG, warnings and output); nothing is
//!   read from global state
//! - **Registries**: [`ClassRegistry`] and [`ForeignRegistry`] are
//!   `Arc`-shared and can serve contexts on several threads
//! - **Host bridge**: Rust types opt in through [`HostClass`]
//!
//! ## Example
//!
//! ```
//! use entwash::{Env, Value};
//!
//! let mut env = Env::new();
//! let list = Value::list([Value::Long(1), Value::from("2")]);
//!
//! let count = env.call_function("count", &[list.clone()]).unwrap();
//! assert_eq!(count, Value::Long(2));
//! assert!(Value::Long(2).loose_eq(&Value::from("2")));
//!
//! let bytes = entwash::serialize(&list);
//! assert_eq!(bytes, b"a:2:{i:0;i:1;i:1;U:1:\"2\";}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod environment;
pub mod error;
pub mod foreign;
pub mod value;

// Re-export main types
pub use context::EnvConfig;
pub use environment::{Binding, Env, ScopeGuard, Warning};
pub use error::{
    type_name, ConfigError, EvalError, FatalError, Result, RuntimeError, UnserializeError,
};
pub use foreign::{
    ForeignClassDef, ForeignRegistry, ForeignValue, FromValue, HostClass, HostClassBuilder,
    HostInterface, HostList, HostMap, IntoValue, ListAdapter, MapAdapter, MethodGroup, Selection,
    Signature,
};
pub use value::{
    cmp_object, print_r, serialize, unserialize, var_dump, var_export, Argument, ArrayDelegate,
    ArrayKey, ArrayValue, Body, Callable, Capture, ClassBuilder, ClassDef, ClassRegistry, Closure,
    ConstValue, Dumper, Function, Invocable, MethodArrayDelegate, NativeFunction, Number,
    ObjectRef, Param, PrintDelegate, Slot, StringBuilder, StringValue, UserFunction, Value, Var,
    STD_CLASS,
};

/// Entwash version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
