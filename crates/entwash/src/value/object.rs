//! Class instances

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use super::array::{ArrayValue, CopyMap};
use super::class::ClassDef;
use super::string::StringValue;
use super::var::{Slot, Var};
use super::Value;
use crate::environment::Env;
use crate::error::{Result, RuntimeError};

/// Instance state: class, fields in insertion order, and identity number.
pub struct ObjectValue {
    class: Arc<ClassDef>,
    fields: IndexMap<String, Slot>,
    id: u64,
}

/// Shared handle to an [`ObjectValue`].
///
/// Cloning aliases the instance; use [`ObjectRef::clone_object`] for a
/// new instance.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectValue>>);

impl ObjectRef {
    /// Create an instance with no fields.
    pub fn new(class: Arc<ClassDef>, id: u64) -> Self {
        ObjectRef(Rc::new(RefCell::new(ObjectValue {
            class,
            fields: IndexMap::new(),
            id,
        })))
    }

    /// The class descriptor.
    pub fn class(&self) -> Arc<ClassDef> {
        Arc::clone(&self.0.borrow().class)
    }

    /// The class name.
    pub fn class_name(&self) -> String {
        self.0.borrow().class.name().to_string()
    }

    /// Identity number shown in dumps (`#N`).
    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    /// Check if two handles alias the same instance.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the instance, for visited sets.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// `instanceof` check.
    pub fn is_a(&self, name: &str) -> bool {
        self.0.borrow().class.is_a(name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Fields
    // ═══════════════════════════════════════════════════════════════════

    /// Read a field. `None` if it was never set.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).map(Slot::get)
    }

    /// Write a field; new fields go at the end.
    pub fn put_field(&self, name: &str, value: Value) {
        let mut obj = self.0.borrow_mut();
        match obj.fields.get_mut(name) {
            Some(slot) => slot.set(value),
            None => {
                obj.fields.insert(name.to_string(), Slot::Value(value));
            }
        }
    }

    /// Remove a field, keeping the order of the rest.
    pub fn remove_field(&self, name: &str) -> Option<Value> {
        self.0
            .borrow_mut()
            .fields
            .shift_remove(name)
            .map(|slot| slot.get())
    }

    /// Check if a field is set.
    pub fn has_field(&self, name: &str) -> bool {
        self.0.borrow().fields.contains_key(name)
    }

    /// Reference cell for a field, upgrading in place or creating it as null.
    pub fn get_field_ref(&self, name: &str) -> Var {
        let mut obj = self.0.borrow_mut();
        obj.fields
            .entry(name.to_string())
            .or_insert_with(|| Slot::Value(Value::Null))
            .to_var()
    }

    /// Bind a reference cell to a field.
    pub fn put_field_ref(&self, name: &str, var: Var) {
        self.0
            .borrow_mut()
            .fields
            .insert(name.to_string(), Slot::Ref(var));
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.0.borrow().fields.len()
    }

    /// Field names and values in insertion order.
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .fields
            .iter()
            .map(|(k, slot)| (k.clone(), slot.get()))
            .collect()
    }

    /// Run `f` on a field's value in place, creating it as null if absent.
    ///
    /// The object stays borrowed while `f` runs, so `f` must not touch this
    /// same instance again.
    pub fn with_field_mut<R>(&self, name: &str, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut obj = self.0.borrow_mut();
        obj.fields
            .entry(name.to_string())
            .or_insert_with(|| Slot::Value(Value::Null))
            .with_mut(f)
    }

    /// Run `f` on the array in a field, creating it if the field is absent
    /// or empty (`$obj->list[] = ...`).
    pub fn with_field_array<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut ArrayValue) -> R,
    ) -> Result<R> {
        self.with_field_mut(name, |v| v.as_array_viv().map(f))
    }

    /// The object in a field, creating a `stdClass` instance if the field
    /// is absent or empty (`$obj->child->x = ...`).
    pub fn get_field_object(&self, env: &mut Env, name: &str) -> Result<ObjectRef> {
        self.with_field_mut(name, |v| v.as_object_viv(env))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Conversions and Copies
    // ═══════════════════════════════════════════════════════════════════

    /// Shallow clone: a new instance with the same class and field values.
    pub fn clone_object(&self, env: &mut Env) -> ObjectRef {
        let obj = self.0.borrow();
        let copy = ObjectRef::new(Arc::clone(&obj.class), env.next_object_id());
        for (name, slot) in &obj.fields {
            copy.put_field(name, slot.get());
        }
        copy
    }

    pub(crate) fn deep_copy_with(&self, map: &mut CopyMap) -> ObjectRef {
        if let Some(copy) = map.objects.get(&self.addr()) {
            return copy.clone();
        }
        let (class, id, fields) = {
            let obj = self.0.borrow();
            (Arc::clone(&obj.class), obj.id, self.fields())
        };
        let copy = ObjectRef::new(class, id);
        map.objects.insert(self.addr(), copy.clone());
        for (name, value) in fields {
            copy.put_field(&name, value.deep_copy_with(map));
        }
        copy
    }

    /// Array cast: fields become string-keyed entries.
    pub fn to_array(&self) -> ArrayValue {
        self.fields().into_iter().collect()
    }

    /// String conversion through `__toString`.
    pub fn to_string_env(&self, env: &mut Env) -> Result<StringValue> {
        let class = self.class();
        match class.find_function_lower_case("__toString") {
            Some(func) => Ok(func.invoke(env, Some(self), &[])?.to_string_value()),
            None => Err(RuntimeError::Conversion {
                expected: "string".to_string(),
                got: format!("object({})", class.name()),
            }
            .into()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════

    /// Call a method on this instance.
    pub fn call_method(&self, env: &mut Env, name: &str, args: &[Value]) -> Result<Value> {
        // Hold the descriptor, not a borrow of the instance, while the
        // method runs: it may write fields.
        let class = self.class();
        let func = class.get_function(name)?;
        func.invoke(env, Some(self), args)
    }

    /// `$obj[$key]` through the class's array delegates.
    pub fn array_get(&self, env: &mut Env, key: &Value) -> Result<Value> {
        let class = self.class();
        for delegate in class.array_delegates() {
            if let Some(result) = delegate.get(env, self, key) {
                return result;
            }
        }
        Err(self.not_an_array())
    }

    /// `$obj[$key] = $value` through the class's array delegates.
    pub fn array_put(&self, env: &mut Env, key: &Value, value: Value) -> Result<()> {
        let class = self.class();
        for delegate in class.array_delegates() {
            if let Some(result) = delegate.put(env, self, key, value.clone()) {
                return result;
            }
        }
        Err(self.not_an_array())
    }

    /// `isset($obj[$key])` through the class's array delegates; `false`
    /// when no delegate answers.
    pub fn array_exists(&self, env: &mut Env, key: &Value) -> Result<bool> {
        let class = self.class();
        for delegate in class.array_delegates() {
            if let Some(result) = delegate.exists(env, self, key) {
                return result;
            }
        }
        Ok(false)
    }

    /// `unset($obj[$key])` through the class's array delegates.
    pub fn array_unset(&self, env: &mut Env, key: &Value) -> Result<()> {
        let class = self.class();
        for delegate in class.array_delegates() {
            if let Some(result) = delegate.unset(env, self, key) {
                return result;
            }
        }
        Err(self.not_an_array())
    }

    fn not_an_array(&self) -> crate::error::EvalError {
        RuntimeError::NotAnArray(format!("object({})", self.class_name())).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ClassBuilder;

    fn object(id: u64) -> ObjectRef {
        ObjectRef::new(Arc::new(ClassBuilder::new("Thing").build()), id)
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let obj = object(1);
        obj.put_field("b", Value::Long(1));
        obj.put_field("a", Value::Long(2));
        obj.put_field("b", Value::Long(3));
        let names: Vec<String> = obj.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(obj.get_field("b"), Some(Value::Long(3)));
    }

    #[test]
    fn test_remove_field_preserves_order() {
        let obj = object(1);
        for name in ["x", "y", "z"] {
            obj.put_field(name, Value::Null);
        }
        obj.remove_field("y");
        let names: Vec<String> = obj.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["x", "z"]);
    }

    #[test]
    fn test_field_ref_aliases() {
        let obj = object(1);
        obj.put_field("n", Value::Long(1));
        let var = obj.get_field_ref("n");
        var.set(Value::Long(9));
        assert_eq!(obj.get_field("n"), Some(Value::Long(9)));
    }

    #[test]
    fn test_handles_alias() {
        let a = object(1);
        let b = a.clone();
        b.put_field("x", Value::Long(1));
        assert!(a.has_field("x"));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_to_array() {
        let obj = object(1);
        obj.put_field("x", Value::Long(1));
        let arr = obj.to_array();
        assert_eq!(arr.get("x"), Some(Value::Long(1)));
    }
}
