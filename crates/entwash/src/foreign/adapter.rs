//! Host collections exposed through the array contract

use std::collections::{BTreeMap, HashMap};

use super::marshal::{FromValue, IntoValue};
use crate::error::{type_name, FatalError, Result, RuntimeError};
use crate::value::{ArrayKey, ArrayValue, Value};

fn conversion<T: FromValue>(value: &Value) -> crate::error::EvalError {
    RuntimeError::Conversion {
        expected: T::EXPECTED.to_string(),
        got: type_name(value).to_string(),
    }
    .into()
}

// ═══════════════════════════════════════════════════════════════════════
// Lists
// ═══════════════════════════════════════════════════════════════════════

/// A host sequence with integer keys `0..len`.
pub trait ListAdapter {
    /// Name shown in dumps and diagnostics.
    fn class_name(&self) -> &'static str {
        "List"
    }

    /// Number of elements.
    fn len(&self) -> usize;

    /// Check if the list is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`.
    fn get(&self, index: usize) -> Option<Value>;

    /// Overwrite `index < len`, or append when `index == len`.
    fn set(&mut self, index: usize, value: Value) -> Result<()>;

    /// Remove the element at `index`, shifting later elements down.
    fn remove(&mut self, index: usize) -> Option<Value>;
}

/// A `Vec<T>` shared with the host.
///
/// Wrap it in `Rc<RefCell<_>>`, keep one handle on the host side and
/// give the other to [`ForeignValue::list`](super::ForeignValue::list);
/// writes made by scripts are visible to the host.
#[derive(Debug, Clone, Default)]
pub struct HostList<T> {
    items: Vec<T>,
}

impl<T> HostList<T> {
    /// Wrap a vector.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// The elements.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Unwrap.
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> ListAdapter for HostList<T>
where
    T: FromValue + IntoValue + Clone,
{
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Option<Value> {
        self.items.get(index).cloned().map(IntoValue::into_value)
    }

    fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let item = T::from_value(&value).ok_or_else(|| conversion::<T>(&value))?;
        match index.cmp(&self.items.len()) {
            std::cmp::Ordering::Less => self.items[index] = item,
            std::cmp::Ordering::Equal => self.items.push(item),
            std::cmp::Ordering::Greater => {
                return Err(FatalError::UnsupportedOperation(format!(
                    "cannot assign index {} of a list with {} elements",
                    index,
                    self.items.len()
                ))
                .into())
            }
        }
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.items.len() {
            Some(self.items.remove(index).into_value())
        } else {
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Maps
// ═══════════════════════════════════════════════════════════════════════

/// A host map with string keys.
pub trait MapAdapter {
    /// Name shown in dumps and diagnostics.
    fn class_name(&self) -> &'static str {
        "Map"
    }

    /// Number of entries.
    fn len(&self) -> usize;

    /// Check if the map is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value for `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Insert or overwrite.
    fn put(&mut self, key: String, value: Value) -> Result<()>;

    /// Remove and return.
    fn remove(&mut self, key: &str) -> Option<Value>;

    /// Keys in the map's iteration order.
    fn keys(&self) -> Vec<String>;
}

/// Storage behind a [`HostMap`].
pub trait MapStore {
    /// Element type
    type Item;

    /// Number of entries.
    fn store_len(&self) -> usize;
    /// Lookup.
    fn store_get(&self, key: &str) -> Option<&Self::Item>;
    /// Insert.
    fn store_put(&mut self, key: String, value: Self::Item);
    /// Remove.
    fn store_remove(&mut self, key: &str) -> Option<Self::Item>;
    /// Keys in iteration order.
    fn store_keys(&self) -> Vec<String>;
}

impl<T> MapStore for BTreeMap<String, T> {
    type Item = T;

    fn store_len(&self) -> usize {
        self.len()
    }

    fn store_get(&self, key: &str) -> Option<&T> {
        self.get(key)
    }

    fn store_put(&mut self, key: String, value: T) {
        self.insert(key, value);
    }

    fn store_remove(&mut self, key: &str) -> Option<T> {
        self.remove(key)
    }

    fn store_keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<T> MapStore for HashMap<String, T> {
    type Item = T;

    fn store_len(&self) -> usize {
        self.len()
    }

    fn store_get(&self, key: &str) -> Option<&T> {
        self.get(key)
    }

    fn store_put(&mut self, key: String, value: T) {
        self.insert(key, value);
    }

    fn store_remove(&mut self, key: &str) -> Option<T> {
        self.remove(key)
    }

    fn store_keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

/// A `BTreeMap<String, T>` or `HashMap<String, T>` shared with the host.
#[derive(Debug, Clone, Default)]
pub struct HostMap<M> {
    entries: M,
}

impl<M> HostMap<M> {
    /// Wrap a map.
    pub fn new(entries: M) -> Self {
        Self { entries }
    }

    /// The wrapped map.
    pub fn entries(&self) -> &M {
        &self.entries
    }

    /// Unwrap.
    pub fn into_inner(self) -> M {
        self.entries
    }
}

impl<M> MapAdapter for HostMap<M>
where
    M: MapStore,
    M::Item: FromValue + IntoValue + Clone,
{
    fn len(&self) -> usize {
        self.entries.store_len()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.store_get(key).cloned().map(IntoValue::into_value)
    }

    fn put(&mut self, key: String, value: Value) -> Result<()> {
        let item = <M::Item as FromValue>::from_value(&value)
            .ok_or_else(|| conversion::<M::Item>(&value))?;
        self.entries.store_put(key, item);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.store_remove(key).map(IntoValue::into_value)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.store_keys()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Snapshots
// ═══════════════════════════════════════════════════════════════════════

pub(crate) fn list_snapshot(list: &dyn ListAdapter) -> ArrayValue {
    (0..list.len()).filter_map(|i| list.get(i)).collect()
}

pub(crate) fn map_snapshot(map: &dyn MapAdapter) -> ArrayValue {
    map.keys()
        .into_iter()
        .filter_map(|k| {
            let v = map.get(&k)?;
            Some((ArrayKey::from(k), v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn test_list_append_at_len() {
        let mut list = HostList::new(vec![1i64, 2]);
        list.set(2, Value::Long(3)).unwrap();
        list.set(0, Value::from("9")).unwrap();
        assert_eq!(list.items(), &[9, 2, 3]);
    }

    #[test]
    fn test_list_gap_is_fatal() {
        let mut list = HostList::new(vec![1i64]);
        let err = list.set(5, Value::Long(3)).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Fatal(FatalError::UnsupportedOperation(_))
        ));
        assert!(!err.is_catchable());
    }

    #[test]
    fn test_list_rejects_wrong_type() {
        let mut list = HostList::new(vec![1i64]);
        assert!(list.set(0, Value::from("one")).is_err());
        assert_eq!(list.items(), &[1]);
    }

    #[test]
    fn test_btree_map_snapshot_is_sorted() {
        let mut m = BTreeMap::new();
        m.insert("b".to_string(), 2i64);
        m.insert("a".to_string(), 1i64);
        let map = HostMap::new(m);
        let snap = map_snapshot(&map);
        assert_eq!(snap.keys(), vec![ArrayKey::from("a"), ArrayKey::from("b")]);
    }
}
