//! Bridge to host (Rust) objects and collections
//!
//! A host type opts in by implementing [`HostClass`]; its descriptor is
//! built once and cached in a [`ForeignRegistry`]. Wrapped instances are
//! shared, never copied: a script holding a [`ForeignValue`] and the host
//! holding the same `Rc` see each other's writes.
//!
//! # Example
//!
//! ```
//! use entwash::{Env, HostClass, HostClassBuilder, Invocable, Value};
//!
//! struct Counter {
//!     n: i64,
//! }
//!
//! impl HostClass for Counter {
//!     const NAME: &'static str = "Counter";
//!
//!     fn describe(b: &mut HostClassBuilder<'_, Self>) {
//!         b.constant("STEP", 1)
//!             .method("bump", 0, |_, this, _| {
//!                 this.n += 1;
//!                 Ok(Value::Long(this.n))
//!             })
//!             .getter("n", |this| Ok(Value::Long(this.n)));
//!     }
//! }
//!
//! let mut env = Env::new();
//! let counter = env.wrap(Counter { n: 0 });
//! let bump = env.to_callable(&Value::list([counter.clone(), Value::from("bump")])).unwrap();
//! bump.call0(&mut env).unwrap();
//! assert_eq!(counter.as_foreign().unwrap().get_field("n"), Value::Long(1));
//! ```

mod adapter;
mod class_def;
mod marshal;

pub use adapter::{HostList, HostMap, ListAdapter, MapAdapter, MapStore};
pub use class_def::{
    ForeignClassDef, ForeignRegistry, HostClassBuilder, HostMethod, MethodGroup, Selection,
    Signature,
};
pub use marshal::{FromValue, IntoValue};

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::environment::Env;
use crate::error::{FatalError, Result, RuntimeError};
use crate::value::{ArrayKey, ArrayValue, ConstValue, Value};

/// A Rust type exposed to scripts.
pub trait HostClass: Any + Sized {
    /// Class name seen by scripts
    const NAME: &'static str;

    /// Register constants, methods, properties and inheritance.
    fn describe(builder: &mut HostClassBuilder<'_, Self>);
}

/// A named set of constants a [`HostClass`] can implement.
pub trait HostInterface {
    /// Interface name
    const NAME: &'static str;

    /// The interface's constants.
    fn constants() -> Vec<(&'static str, ConstValue)>;
}

/// A wrapped host instance or host collection.
#[derive(Clone)]
pub enum ForeignValue {
    /// Instance of a described host class
    Object {
        /// Shared descriptor
        def: Arc<ForeignClassDef>,
        /// The host value
        inner: Rc<RefCell<dyn Any>>,
    },
    /// Host sequence
    List(Rc<RefCell<dyn ListAdapter>>),
    /// Host string-keyed map
    Map(Rc<RefCell<dyn MapAdapter>>),
}

impl ForeignValue {
    pub(crate) fn from_parts(def: Arc<ForeignClassDef>, inner: Rc<RefCell<dyn Any>>) -> Self {
        ForeignValue::Object { def, inner }
    }

    /// Expose a host list.
    pub fn list<L: ListAdapter + 'static>(list: Rc<RefCell<L>>) -> Self {
        ForeignValue::List(list)
    }

    /// Expose a host map.
    pub fn map<M: MapAdapter + 'static>(map: Rc<RefCell<M>>) -> Self {
        ForeignValue::Map(map)
    }

    /// Class name (`List` and `Map` for collections).
    pub fn class_name(&self) -> String {
        match self {
            ForeignValue::Object { def, .. } => def.name().to_string(),
            ForeignValue::List(l) => l.borrow().class_name().to_string(),
            ForeignValue::Map(m) => m.borrow().class_name().to_string(),
        }
    }

    /// The descriptor, for wrapped instances.
    pub fn class_def(&self) -> Option<&Arc<ForeignClassDef>> {
        match self {
            ForeignValue::Object { def, .. } => Some(def),
            _ => None,
        }
    }

    /// `instanceof` check.
    pub fn is_a(&self, name: &str) -> bool {
        match self {
            ForeignValue::Object { def, .. } => def.is_a(name),
            _ => self.class_name().eq_ignore_ascii_case(name),
        }
    }

    /// Check if two handles wrap the same host value.
    pub fn ptr_eq(&self, other: &ForeignValue) -> bool {
        match (self, other) {
            (ForeignValue::Object { inner: a, .. }, ForeignValue::Object { inner: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (ForeignValue::List(a), ForeignValue::List(b)) => Rc::ptr_eq(a, b),
            (ForeignValue::Map(a), ForeignValue::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Truthiness: instances are true, collections when non-empty.
    pub fn to_bool(&self) -> bool {
        match self {
            ForeignValue::Object { .. } => true,
            ForeignValue::List(l) => !l.borrow().is_empty(),
            ForeignValue::Map(m) => !m.borrow().is_empty(),
        }
    }

    /// Number of elements, for collections.
    pub fn len(&self) -> Option<usize> {
        match self {
            ForeignValue::Object { .. } => None,
            ForeignValue::List(l) => Some(l.borrow().len()),
            ForeignValue::Map(m) => Some(m.borrow().len()),
        }
    }

    /// Run `f` on the host value if it is a `T`.
    pub fn with_host<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        match self {
            ForeignValue::Object { inner, .. } => {
                let guard = inner.try_borrow().ok()?;
                guard.downcast_ref::<T>().map(f)
            }
            _ => None,
        }
    }

    /// Run `f` on the host value mutably if it is a `T`.
    pub fn with_host_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        match self {
            ForeignValue::Object { inner, .. } => {
                let mut guard = inner.try_borrow_mut().ok()?;
                guard.downcast_mut::<T>().map(f)
            }
            _ => None,
        }
    }

    fn borrow_host<'a>(
        inner: &'a Rc<RefCell<dyn Any>>,
        def: &ForeignClassDef,
    ) -> Result<std::cell::RefMut<'a, dyn Any>> {
        inner.try_borrow_mut().map_err(|_| {
            FatalError::UnsupportedOperation(format!(
                "re-entrant access to host object {}",
                def.name()
            ))
            .into()
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Copies and Snapshots
    // ═══════════════════════════════════════════════════════════════════

    /// Collections as a plain array; `None` for instances.
    pub fn snapshot(&self) -> Option<ArrayValue> {
        match self {
            ForeignValue::Object { .. } => None,
            ForeignValue::List(l) => Some(adapter::list_snapshot(&*l.borrow())),
            ForeignValue::Map(m) => Some(adapter::map_snapshot(&*m.borrow())),
        }
    }

    /// Value copy: collections are snapshotted into a plain array, while
    /// instances stay shared handles.
    pub fn copy(&self) -> Value {
        match self.snapshot() {
            Some(array) => Value::Array(array),
            None => Value::Foreign(self.clone()),
        }
    }

    /// Readable properties of an instance, in name order.
    pub fn properties(&self) -> Vec<(String, Value)> {
        let ForeignValue::Object { def, inner } = self else {
            return Vec::new();
        };
        let Ok(mut guard) = inner.try_borrow_mut() else {
            return Vec::new();
        };
        def.property_names()
            .into_iter()
            .filter_map(|name| {
                let value = def.get_property(&mut *guard, name)?;
                Some((name.to_string(), value))
            })
            .collect()
    }

    /// Values visited by `foreach`: collection contents, or the output of
    /// the class's iteration method.
    pub fn iterate(&self) -> Result<ArrayValue> {
        match self {
            ForeignValue::Object { def, inner } => {
                let mut guard = Self::borrow_host(inner, def)?;
                def.iterate(&mut *guard)
                    .map(ArrayValue::from_values)
                    .ok_or_else(|| RuntimeError::NotAnArray(def.name().to_string()).into())
            }
            _ => Ok(self.snapshot().unwrap_or_default()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Members
    // ═══════════════════════════════════════════════════════════════════

    /// Call a method on a wrapped instance.
    pub fn call_method(&self, env: &mut Env, name: &str, args: &[Value]) -> Result<Value> {
        match self {
            ForeignValue::Object { def, inner } => {
                let group = def.find_method(name).ok_or_else(|| RuntimeError::UnknownMethod {
                    class: def.name().to_string(),
                    method: name.to_string(),
                })?;
                let mut guard = Self::borrow_host(inner, def)?;
                group.invoke(env, &mut *guard, args)
            }
            _ => Err(RuntimeError::UnknownMethod {
                class: self.class_name(),
                method: name.to_string(),
            }
            .into()),
        }
    }

    /// Class constant of a wrapped instance.
    pub fn get_constant(&self, name: &str) -> Result<Value> {
        match self {
            ForeignValue::Object { def, .. } => def.get_constant(name),
            _ => Err(RuntimeError::UnknownConstant {
                class: self.class_name(),
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Property read; null when the property is missing or its getter
    /// fails.
    pub fn get_field(&self, name: &str) -> Value {
        let ForeignValue::Object { def, inner } = self else {
            return Value::Null;
        };
        match inner.try_borrow_mut() {
            Ok(mut guard) => def.get_property(&mut *guard, name).unwrap_or_default(),
            Err(_) => {
                tracing::debug!(class = %def.name(), property = name, "Host object busy");
                Value::Null
            }
        }
    }

    /// Property write; returns whether a setter accepted it.
    pub fn put_field(&self, name: &str, value: Value) -> bool {
        let ForeignValue::Object { def, inner } = self else {
            return false;
        };
        match inner.try_borrow_mut() {
            Ok(mut guard) => def.set_property(&mut *guard, name, value),
            Err(_) => {
                tracing::debug!(class = %def.name(), property = name, "Host object busy");
                false
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Array Contract
    // ═══════════════════════════════════════════════════════════════════

    fn list_index(key: &Value) -> Option<usize> {
        match key.try_key()? {
            ArrayKey::Int(n) => usize::try_from(n).ok(),
            ArrayKey::Str(_) => None,
        }
    }

    fn map_key(key: &Value) -> String {
        key.to_string_value().to_str_lossy().into_owned()
    }

    /// `$c[$key]`; null when absent.
    pub fn get(&self, key: &Value) -> Result<Value> {
        match self {
            ForeignValue::List(l) => Ok(Self::list_index(key)
                .and_then(|i| l.borrow().get(i))
                .unwrap_or_default()),
            ForeignValue::Map(m) => Ok(m.borrow().get(&Self::map_key(key)).unwrap_or_default()),
            ForeignValue::Object { def, .. } => {
                Err(RuntimeError::NotAnArray(def.name().to_string()).into())
            }
        }
    }

    /// `$c[$key] = $value`. Lists accept indices up to their length.
    pub fn put(&self, key: &Value, value: Value) -> Result<()> {
        match self {
            ForeignValue::List(l) => {
                let index = Self::list_index(key).ok_or_else(|| {
                    FatalError::UnsupportedOperation(format!(
                        "cannot assign key {} of a list",
                        key.to_string_value()
                    ))
                })?;
                l.borrow_mut().set(index, value)
            }
            ForeignValue::Map(m) => m.borrow_mut().put(Self::map_key(key), value),
            ForeignValue::Object { def, .. } => {
                Err(RuntimeError::NotAnArray(def.name().to_string()).into())
            }
        }
    }

    /// `$c[] = $value`.
    pub fn append(&self, value: Value) -> Result<()> {
        match self {
            ForeignValue::List(l) => {
                let len = l.borrow().len();
                l.borrow_mut().set(len, value)
            }
            _ => Err(RuntimeError::NotAnArray(self.class_name()).into()),
        }
    }

    /// `unset($c[$key])`, returning the removed value.
    pub fn remove(&self, key: &Value) -> Result<Option<Value>> {
        match self {
            ForeignValue::List(l) => {
                Ok(Self::list_index(key).and_then(|i| l.borrow_mut().remove(i)))
            }
            ForeignValue::Map(m) => Ok(m.borrow_mut().remove(&Self::map_key(key))),
            ForeignValue::Object { def, .. } => {
                Err(RuntimeError::NotAnArray(def.name().to_string()).into())
            }
        }
    }
}

impl std::fmt::Debug for ForeignValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Foreign({})", self.class_name())
    }
}

impl From<ForeignValue> for Value {
    fn from(f: ForeignValue) -> Self {
        Value::Foreign(f)
    }
}

impl Value {
    /// The wrapped host value, if this is one.
    pub fn as_foreign(&self) -> Option<&ForeignValue> {
        match self {
            Value::Foreign(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_list_copy_is_a_snapshot() {
        let host = Rc::new(RefCell::new(HostList::new(vec![1i64, 2])));
        let list = ForeignValue::list(Rc::clone(&host));
        let copy = list.copy();
        list.append(Value::Long(3)).unwrap();
        assert_eq!(host.borrow().items(), &[1, 2, 3]);
        assert_eq!(copy.as_array().map(ArrayValue::len), Some(2));
    }

    #[test]
    fn test_map_contract() {
        let host = Rc::new(RefCell::new(HostMap::new(BTreeMap::<String, String>::new())));
        let map = ForeignValue::map(Rc::clone(&host));
        map.put(&Value::from("k"), Value::from("v")).unwrap();
        assert_eq!(map.get(&Value::from("k")).unwrap(), Value::from("v"));
        assert_eq!(map.get(&Value::from("missing")).unwrap(), Value::Null);
        assert_eq!(map.len(), Some(1));
        assert_eq!(map.remove(&Value::from("k")).unwrap(), Some(Value::from("v")));
        assert!(host.borrow().entries().is_empty());
    }

    #[test]
    fn test_list_string_key_is_fatal() {
        let host = Rc::new(RefCell::new(HostList::new(vec![1i64])));
        let list = ForeignValue::list(host);
        let err = list.put(&Value::from("x"), Value::Long(1)).unwrap_err();
        assert!(!err.is_catchable());
    }
}
