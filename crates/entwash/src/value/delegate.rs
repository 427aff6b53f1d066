//! Ordered capability chains for objects
//!
//! A class may carry several array-access and print implementations. They
//! are tried in order; the first one that answers wins, and the built-in
//! behaviour runs when none does.

use std::sync::Arc;

use super::object::ObjectRef;
use super::Value;
use crate::environment::Env;
use crate::error::Result;

/// An ordered list of capability implementations.
pub struct DelegateChain<D: ?Sized> {
    items: Vec<Arc<D>>,
}

impl<D: ?Sized> Default for DelegateChain<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ?Sized> DelegateChain<D> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an implementation at the end.
    pub fn push(&mut self, item: Arc<D>) {
        self.items.push(item);
    }

    /// Iterate in dispatch order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<D>> {
        self.items.iter()
    }

    /// Number of implementations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Array-style access on objects (`$obj[$k]`).
///
/// Each method returns `None` to pass the request down the chain.
pub trait ArrayDelegate: Send + Sync {
    /// Read `$obj[$key]`.
    fn get(&self, env: &mut Env, obj: &ObjectRef, key: &Value) -> Option<Result<Value>>;

    /// Write `$obj[$key] = $value`.
    fn put(&self, env: &mut Env, obj: &ObjectRef, key: &Value, value: Value)
        -> Option<Result<()>>;

    /// `isset($obj[$key])`.
    fn exists(&self, env: &mut Env, obj: &ObjectRef, key: &Value) -> Option<Result<bool>>;

    /// `unset($obj[$key])`.
    fn unset(&self, env: &mut Env, obj: &ObjectRef, key: &Value) -> Option<Result<()>>;
}

/// Dispatches array access to the `offsetGet`/`offsetSet`/`offsetExists`/
/// `offsetUnset` methods when the class declares them.
pub struct MethodArrayDelegate;

impl MethodArrayDelegate {
    fn call(env: &mut Env, obj: &ObjectRef, method: &str, args: &[Value]) -> Option<Result<Value>> {
        let func = obj.class().find_function_lower_case(method).cloned()?;
        Some(func.invoke(env, Some(obj), args))
    }
}

impl ArrayDelegate for MethodArrayDelegate {
    fn get(&self, env: &mut Env, obj: &ObjectRef, key: &Value) -> Option<Result<Value>> {
        Self::call(env, obj, "offsetGet", &[key.clone()])
    }

    fn put(
        &self,
        env: &mut Env,
        obj: &ObjectRef,
        key: &Value,
        value: Value,
    ) -> Option<Result<()>> {
        Self::call(env, obj, "offsetSet", &[key.clone(), value]).map(|r| r.map(|_| ()))
    }

    fn exists(&self, env: &mut Env, obj: &ObjectRef, key: &Value) -> Option<Result<bool>> {
        Self::call(env, obj, "offsetExists", &[key.clone()]).map(|r| r.map(|v| v.to_bool()))
    }

    fn unset(&self, env: &mut Env, obj: &ObjectRef, key: &Value) -> Option<Result<()>> {
        Self::call(env, obj, "offsetUnset", &[key.clone()]).map(|r| r.map(|_| ()))
    }
}

/// Custom debug output for objects.
///
/// Returning `false` passes to the next delegate and finally to the
/// default field listing.
pub trait PrintDelegate: Send + Sync {
    /// Write the `var_dump` body for `obj` at `depth`.
    fn var_dump(&self, obj: &ObjectRef, depth: usize, out: &mut String) -> bool;

    /// Write the `print_r` body for `obj` at `depth`.
    fn print_r(&self, _obj: &ObjectRef, _depth: usize, _out: &mut String) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let mut chain: DelegateChain<str> = DelegateChain::new();
        chain.push(Arc::from("first"));
        chain.push(Arc::from("second"));
        let names: Vec<&str> = chain.iter().map(|s| &**s).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(chain.len(), 2);
    }
}
