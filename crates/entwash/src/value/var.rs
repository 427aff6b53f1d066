//! Reference cells and container slots

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use super::Value;

/// A shared, mutable single-value cell.
///
/// Cloning a `Var` aliases it: every clone observes writes through any
/// other. This is how `$b = &$a` and by-reference captures work.
#[derive(Clone, Default)]
pub struct Var(Rc<RefCell<Value>>);

impl Var {
    /// Create a new cell.
    pub fn new(value: Value) -> Self {
        Var(Rc::new(RefCell::new(value)))
    }

    /// Current value (arrays are shared copy-on-write).
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Overwrite the value.
    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// Overwrite the value, returning the previous one.
    pub fn replace(&self, value: Value) -> Value {
        self.0.replace(value)
    }

    /// Borrow the value.
    pub fn borrow(&self) -> Ref<'_, Value> {
        self.0.borrow()
    }

    /// Borrow the value mutably.
    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.0.borrow_mut()
    }

    /// Run `f` against the value in place.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Check if two handles alias the same cell.
    pub fn ptr_eq(&self, other: &Var) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the cell, for visited sets.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(v) => write!(f, "&{:?}", *v),
            Err(_) => write!(f, "&<borrowed>"),
        }
    }
}

/// The storage of one array entry or object field.
#[derive(Clone, Debug)]
pub enum Slot {
    /// Plain value, copied with its container
    Value(Value),
    /// Reference cell, shared by every container holding it
    Ref(Var),
}

impl Slot {
    /// Read the slot's value.
    pub fn get(&self) -> Value {
        match self {
            Slot::Value(v) => v.clone(),
            Slot::Ref(var) => var.get(),
        }
    }

    /// Write a value; reference slots write through to their cell.
    pub fn set(&mut self, value: Value) {
        match self {
            Slot::Value(v) => *v = value,
            Slot::Ref(var) => var.set(value),
        }
    }

    /// Upgrade the slot to a reference cell in place and return it.
    pub fn to_var(&mut self) -> Var {
        match self {
            Slot::Ref(var) => var.clone(),
            Slot::Value(v) => {
                let var = Var::new(std::mem::take(v));
                *self = Slot::Ref(var.clone());
                var
            }
        }
    }

    /// Check if the slot holds a reference cell.
    pub fn is_ref(&self) -> bool {
        matches!(self, Slot::Ref(_))
    }

    /// Run `f` against the stored value in place.
    pub fn with_mut<R>(&mut self, f: impl FnOnce(&mut Value) -> R) -> R {
        match self {
            Slot::Value(v) => f(v),
            Slot::Ref(var) => var.with_mut(f),
        }
    }
}

/// A call argument: either a value or a reference for by-reference
/// parameters.
#[derive(Clone, Debug)]
pub enum Argument {
    /// Passed by value
    Value(Value),
    /// Passed by reference
    Ref(Var),
}

impl Argument {
    /// The argument's current value.
    pub fn value(&self) -> Value {
        match self {
            Argument::Value(v) => v.clone(),
            Argument::Ref(var) => var.get(),
        }
    }

    /// The reference cell, if passed by reference.
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Argument::Ref(var) => Some(var),
            Argument::Value(_) => None,
        }
    }

    /// Turn into a cell: the shared one for references, a fresh one otherwise.
    pub fn into_var(self) -> Var {
        match self {
            Argument::Ref(var) => var,
            Argument::Value(v) => Var::new(v),
        }
    }
}

impl From<Value> for Argument {
    fn from(v: Value) -> Self {
        Argument::Value(v)
    }
}

impl From<Var> for Argument {
    fn from(var: Var) -> Self {
        Argument::Ref(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_aliases() {
        let a = Var::new(Value::Long(1));
        let b = a.clone();
        b.set(Value::Long(2));
        assert_eq!(a.get(), Value::Long(2));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_slot_upgrade_keeps_value() {
        let mut slot = Slot::Value(Value::Long(5));
        let var = slot.to_var();
        assert!(slot.is_ref());
        assert_eq!(var.get(), Value::Long(5));

        var.set(Value::Long(6));
        assert_eq!(slot.get(), Value::Long(6));

        // upgrading again returns the same cell
        assert!(slot.to_var().ptr_eq(&var));
    }

    #[test]
    fn test_set_writes_through_ref_slot() {
        let var = Var::new(Value::Null);
        let mut slot = Slot::Ref(var.clone());
        slot.set(Value::Bool(true));
        assert_eq!(var.get(), Value::Bool(true));
    }
}
