//! Ordered associative arrays with copy-on-write storage
//!
//! Entries live in a slab (`Vec<Entry>`) and are threaded into a doubly
//! linked list in insertion order; a hash index maps each key to its slab
//! position. Removed positions go on a free list and are reused.
//!
//! An [`ArrayValue`] handle shares its [`ArrayData`] through an `Rc`. Cloning
//! the handle is a logical copy; the first mutation through a shared handle
//! forks a private copy (`fork`), which is the only place storage is
//! duplicated. Entries holding a [`Var`] keep sharing that cell after a
//! fork, so references survive copies.

use std::collections::HashMap;
use std::rc::Rc;

use rand::Rng;

use super::key::ArrayKey;
use super::object::ObjectRef;
use super::var::{Argument, Slot, Var};
use super::Value;
use crate::environment::Env;
use crate::error::{type_name, Result, RuntimeError};

#[derive(Clone)]
struct Entry {
    key: ArrayKey,
    slot: Slot,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Shared backing storage of an array.
#[derive(Clone, Default)]
pub(crate) struct ArrayData {
    entries: Vec<Entry>,
    free: Vec<usize>,
    index: HashMap<ArrayKey, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    next_index: i64,
}

impl ArrayData {
    fn len(&self) -> usize {
        self.index.len()
    }

    /// Append a new entry at the end of the list.
    fn link(&mut self, key: ArrayKey, slot: Slot) -> usize {
        if let ArrayKey::Int(n) = key {
            if n >= self.next_index {
                self.next_index = n.saturating_add(1);
            }
        }

        let entry = Entry {
            key: key.clone(),
            slot,
            prev: self.tail,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(i) => {
                self.entries[i] = entry;
                i
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };

        match self.tail {
            Some(t) => self.entries[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.index.insert(key, idx);
        idx
    }

    /// Detach an entry; returns its slot and the position that followed it.
    fn unlink(&mut self, idx: usize) -> (Slot, Option<usize>) {
        let (prev, next) = (self.entries[idx].prev, self.entries[idx].next);
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.tail = prev,
        }

        let entry = &mut self.entries[idx];
        self.index.remove(&entry.key);
        entry.prev = None;
        entry.next = None;
        self.free.push(idx);
        (std::mem::replace(&mut entry.slot, Slot::Value(Value::Null)), next)
    }

    fn position_or_insert(&mut self, key: ArrayKey) -> usize {
        match self.index.get(&key) {
            Some(&idx) => idx,
            None => self.link(key, Slot::Value(Value::Null)),
        }
    }

    fn max_int_key(&self) -> Option<i64> {
        self.index.keys().filter_map(ArrayKey::as_int).max()
    }
}

/// Internal pointer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    /// At the first entry, whatever it currently is
    Head,
    /// At a specific slab position
    At(usize),
    /// Moved beyond either end
    Past,
}

/// An ordered map from [`ArrayKey`] to [`Value`].
///
/// # Example
///
/// ```
/// use entwash::{ArrayValue, Value};
///
/// let mut a = ArrayValue::new();
/// a.append(Value::Long(10));
/// a.put("name", Value::from("x"));
///
/// let mut b = a.clone(); // logical copy
/// b.put(0, Value::Long(99));
///
/// assert_eq!(a.get(0), Some(Value::Long(10)));
/// assert_eq!(b.get(0), Some(Value::Long(99)));
/// ```
#[derive(Clone)]
pub struct ArrayValue {
    data: Rc<ArrayData>,
    cursor: Cursor,
}

impl Default for ArrayValue {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayValue {
    /// Create an empty array.
    pub fn new() -> Self {
        Self {
            data: Rc::new(ArrayData::default()),
            cursor: Cursor::Head,
        }
    }

    /// Build a list keyed `0..n`.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let mut array = Self::new();
        for v in values {
            array.append(v);
        }
        array
    }

    /// Get a private copy of the backing storage, forking if shared.
    fn fork(&mut self) -> &mut ArrayData {
        if Rc::strong_count(&self.data) > 1 {
            tracing::trace!(len = self.data.len(), "copy-on-write fork");
        }
        Rc::make_mut(&mut self.data)
    }

    /// Check if this handle's storage is currently shared with another.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.data) > 1
    }

    /// Identity of the backing storage, for visited sets.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.data) as *const () as usize
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the array has no entries.
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// The key the next `append` will use.
    pub fn next_index(&self) -> i64 {
        self.data.next_index
    }

    // ═══════════════════════════════════════════════════════════════════
    // Keyed Access
    // ═══════════════════════════════════════════════════════════════════

    /// Look up a key. `None` means unset, which is distinct from a stored null.
    pub fn get(&self, key: impl Into<ArrayKey>) -> Option<Value> {
        let key = key.into();
        self.data
            .index
            .get(&key)
            .map(|&idx| self.data.entries[idx].slot.get())
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: impl Into<ArrayKey>) -> bool {
        self.data.index.contains_key(&key.into())
    }

    /// Insert or overwrite. Overwriting keeps the entry's position and
    /// writes through reference slots.
    pub fn put(&mut self, key: impl Into<ArrayKey>, value: Value) {
        let key = key.into();
        let data = self.fork();
        match data.index.get(&key) {
            Some(&idx) => data.entries[idx].slot.set(value),
            None => {
                data.link(key, Slot::Value(value));
            }
        }
    }

    /// Append under the next integer key and return that key.
    pub fn append(&mut self, value: Value) -> ArrayKey {
        let key = ArrayKey::Int(self.data.next_index);
        self.put(key.clone(), value);
        key
    }

    /// Remove a key, returning its value.
    ///
    /// The next append key is never lowered by removal.
    pub fn remove(&mut self, key: impl Into<ArrayKey>) -> Option<Value> {
        let key = key.into();
        let idx = *self.data.index.get(&key)?;
        let cursor = self.cursor;
        let (slot, next) = self.fork().unlink(idx);
        if cursor == Cursor::At(idx) {
            self.cursor = next.map_or(Cursor::Past, Cursor::At);
        }
        Some(slot.get())
    }

    /// Reference cell for a key, upgrading a plain entry in place or
    /// creating a null entry if absent.
    pub fn get_ref(&mut self, key: impl Into<ArrayKey>) -> Var {
        let data = self.fork();
        let idx = data.position_or_insert(key.into());
        data.entries[idx].slot.to_var()
    }

    /// Argument for a call: a reference cell when `by_ref`, otherwise the
    /// current value (null if unset).
    pub fn get_arg(&mut self, key: impl Into<ArrayKey>, by_ref: bool) -> Argument {
        if by_ref {
            Argument::Ref(self.get_ref(key))
        } else {
            Argument::Value(self.get(key).unwrap_or_default())
        }
    }

    /// Bind an existing reference cell at a key (`$a[k] = &$var`).
    pub fn put_ref(&mut self, key: impl Into<ArrayKey>, var: Var) {
        let key = key.into();
        let data = self.fork();
        match data.index.get(&key) {
            Some(&idx) => data.entries[idx].slot = Slot::Ref(var),
            None => {
                data.link(key, Slot::Ref(var));
            }
        }
    }

    /// Append a reference cell under the next integer key.
    pub fn append_ref(&mut self, var: Var) -> ArrayKey {
        let key = ArrayKey::Int(self.data.next_index);
        self.put_ref(key.clone(), var);
        key
    }

    /// Run `f` on the value stored at `key` in place, creating a null
    /// entry if absent. Reference slots are modified through their cell.
    pub fn with_entry_mut<R>(
        &mut self,
        key: impl Into<ArrayKey>,
        f: impl FnOnce(&mut Value) -> R,
    ) -> R {
        let data = self.fork();
        let idx = data.position_or_insert(key.into());
        data.entries[idx].slot.with_mut(f)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Autovivification
    // ═══════════════════════════════════════════════════════════════════

    /// Run `f` on the nested array at `key`, creating it if the entry is
    /// absent or empty (`$a[k][] = ...`). The nested array is modified in
    /// place inside this array.
    pub fn with_array<R>(
        &mut self,
        key: impl Into<ArrayKey>,
        f: impl FnOnce(&mut ArrayValue) -> R,
    ) -> Result<R> {
        self.with_entry_mut(key, |v| v.as_array_viv().map(f))
    }

    /// The object at `key`, creating a `stdClass` instance if the entry is
    /// absent or empty (`$a[k]->x = ...`).
    pub fn get_object(&mut self, env: &mut Env, key: impl Into<ArrayKey>) -> Result<ObjectRef> {
        self.with_entry_mut(key, |v| v.as_object_viv(env))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Iteration
    // ═══════════════════════════════════════════════════════════════════

    /// Iterate over entries in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            data: &self.data,
            next: self.data.head,
        }
    }

    /// Keys in order.
    pub fn keys(&self) -> Vec<ArrayKey> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Values in order.
    pub fn values(&self) -> Vec<Value> {
        self.iter().map(|(_, slot)| slot.get()).collect()
    }

    /// Key/value pairs in order.
    pub fn entries(&self) -> Vec<(ArrayKey, Value)> {
        self.iter().map(|(k, slot)| (k.clone(), slot.get())).collect()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Internal Cursor
    // ═══════════════════════════════════════════════════════════════════

    fn cursor_index(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Head => self.data.head,
            Cursor::At(idx) => Some(idx),
            Cursor::Past => None,
        }
    }

    /// Value under the cursor, `None` when beyond the end.
    pub fn current(&self) -> Option<Value> {
        self.cursor_index()
            .map(|idx| self.data.entries[idx].slot.get())
    }

    /// Key under the cursor.
    pub fn key(&self) -> Option<ArrayKey> {
        self.cursor_index()
            .map(|idx| self.data.entries[idx].key.clone())
    }

    /// Advance and return the new current value.
    pub fn next(&mut self) -> Option<Value> {
        self.cursor = match self.cursor_index().and_then(|i| self.data.entries[i].next) {
            Some(n) => Cursor::At(n),
            None => Cursor::Past,
        };
        self.current()
    }

    /// Step back and return the new current value.
    pub fn prev(&mut self) -> Option<Value> {
        self.cursor = match self.cursor_index().and_then(|i| self.data.entries[i].prev) {
            Some(p) => Cursor::At(p),
            None => Cursor::Past,
        };
        self.current()
    }

    /// Rewind to the first entry and return its value.
    pub fn reset(&mut self) -> Option<Value> {
        self.cursor = Cursor::Head;
        self.current()
    }

    /// Move to the last entry and return its value.
    pub fn end(&mut self) -> Option<Value> {
        self.cursor = self.data.tail.map_or(Cursor::Past, Cursor::At);
        self.current()
    }

    /// Return the current pair, then advance.
    ///
    /// The pair is `[0 => key, "key" => key, 1 => value, "value" => value]`;
    /// `None` at the end.
    pub fn each(&mut self) -> Option<ArrayValue> {
        let idx = self.cursor_index()?;
        let entry = &self.data.entries[idx];
        let key = entry.key_value();
        let value = entry.slot.get();

        let mut pair = ArrayValue::new();
        pair.put(0, key.clone());
        pair.put("key", key);
        pair.put(1, value.clone());
        pair.put("value", value);

        self.next();
        Some(pair)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Whole-Array Operations
    // ═══════════════════════════════════════════════════════════════════

    /// Rebuild the storage from ordered slots.
    fn rebuild(&mut self, slots: Vec<(ArrayKey, Slot)>) {
        let mut data = ArrayData::default();
        for (key, slot) in slots {
            data.link(key, slot);
        }
        self.data = Rc::new(data);
        self.cursor = Cursor::Head;
    }

    fn take_slots(&self) -> Vec<(ArrayKey, Slot)> {
        self.iter().map(|(k, s)| (k.clone(), s.clone())).collect()
    }

    /// Shuffle entries and renumber keys `0..n`.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.shuffle_with(|bound| rng.random_range(0..=bound));
    }

    /// Fisher-Yates shuffle with a caller-supplied picker returning an
    /// index in `0..=bound`.
    pub fn shuffle_with(&mut self, mut pick: impl FnMut(usize) -> usize) {
        let mut slots: Vec<Slot> = self.take_slots().into_iter().map(|(_, s)| s).collect();
        for i in (1..slots.len()).rev() {
            let j = pick(i).min(i);
            slots.swap(i, j);
        }
        self.rebuild(
            slots
                .into_iter()
                .enumerate()
                .map(|(i, s)| (ArrayKey::from(i), s))
                .collect(),
        );
    }

    /// Remove and return the last value. The next append key becomes one
    /// past the largest remaining integer key.
    pub fn pop(&mut self) -> Option<Value> {
        let tail = self.data.tail?;
        let data = self.fork();
        let (slot, _) = data.unlink(tail);
        data.next_index = data.max_int_key().map_or(0, |n| n.saturating_add(1));
        if self.cursor == Cursor::At(tail) {
            self.cursor = Cursor::Past;
        }
        Some(slot.get())
    }

    /// Prepend a value; integer keys are renumbered from 0, string keys kept.
    pub fn unshift(&mut self, value: Value) {
        let mut slots = vec![(ArrayKey::Int(0), Slot::Value(value))];
        let mut next = 1i64;
        for (key, slot) in self.take_slots() {
            let key = match key {
                ArrayKey::Int(_) => {
                    next += 1;
                    ArrayKey::Int(next - 1)
                }
                k => k,
            };
            slots.push((key, slot));
        }
        self.rebuild(slots);
    }

    /// Renumber keys in order starting at `base`. String keys are kept
    /// unless `strict`, in which case every key is renumbered.
    pub fn key_reset(&mut self, base: i64, strict: bool) {
        let mut next = base;
        let slots = self
            .take_slots()
            .into_iter()
            .map(|(key, slot)| match key {
                ArrayKey::Str(_) if !strict => (key, slot),
                _ => {
                    next += 1;
                    (ArrayKey::Int(next - 1), slot)
                }
            })
            .collect();
        self.rebuild(slots);
    }

    /// Stable sort by a comparator over `(key, value)`. With `reset_keys`
    /// the result is renumbered `0..n`.
    pub fn sort_by<F>(&mut self, mut cmp: F, reset_keys: bool)
    where
        F: FnMut((&ArrayKey, &Value), (&ArrayKey, &Value)) -> std::cmp::Ordering,
    {
        let mut items: Vec<(ArrayKey, Slot, Value)> = self
            .take_slots()
            .into_iter()
            .map(|(k, s)| {
                let v = s.get();
                (k, s, v)
            })
            .collect();
        items.sort_by(|a, b| cmp((&a.0, &a.2), (&b.0, &b.2)));

        let slots = items
            .into_iter()
            .enumerate()
            .map(|(i, (k, s, _))| {
                if reset_keys {
                    (ArrayKey::from(i), s)
                } else {
                    (k, s)
                }
            })
            .collect();
        self.rebuild(slots);
    }

    /// First key whose value loosely equals `needle`.
    pub fn contains(&self, needle: &Value) -> Option<ArrayKey> {
        self.iter()
            .find(|(_, slot)| slot.get().loose_eq(needle))
            .map(|(k, _)| k.clone())
    }

    /// First key whose value strictly equals `needle`.
    pub fn contains_strict(&self, needle: &Value) -> Option<ArrayKey> {
        self.iter()
            .find(|(_, slot)| slot.get().strict_eq(needle))
            .map(|(k, _)| k.clone())
    }

    /// Put every entry of `other` into this array.
    pub fn put_all(&mut self, other: &ArrayValue) {
        for (key, slot) in other.iter() {
            self.put(key.clone(), slot.get());
        }
    }

    /// Array union (`+`): entries of `other` whose keys are absent here.
    pub fn union(&self, other: &ArrayValue) -> ArrayValue {
        let mut result = self.clone();
        for (key, slot) in other.iter() {
            if !result.contains_key(key) {
                result.put(key.clone(), slot.get());
            }
        }
        result
    }

    /// Remove every entry. The next append key restarts at 0.
    pub fn clear(&mut self) {
        self.data = Rc::new(ArrayData::default());
        self.cursor = Cursor::Head;
    }

    /// A fully independent copy: nested arrays, objects and reference
    /// cells are duplicated, with shared or cyclic parts copied once.
    pub fn deep_copy(&self) -> ArrayValue {
        self.deep_copy_with(&mut CopyMap::default())
    }

    pub(crate) fn deep_copy_with(&self, map: &mut CopyMap) -> ArrayValue {
        let mut copy = ArrayData::default();
        for (key, slot) in self.iter() {
            let slot = match slot {
                Slot::Value(v) => Slot::Value(v.deep_copy_with(map)),
                Slot::Ref(var) => Slot::Ref(map.var(var)),
            };
            copy.link(key.clone(), slot);
        }
        copy.next_index = self.data.next_index;
        ArrayValue {
            data: Rc::new(copy),
            cursor: Cursor::Head,
        }
    }
}

impl Entry {
    fn key_value(&self) -> Value {
        match &self.key {
            ArrayKey::Int(n) => Value::Long(*n),
            ArrayKey::Str(s) => Value::String(s.clone()),
        }
    }
}

/// Identity map used by deep copies: original handle address to copy.
#[derive(Default)]
pub(crate) struct CopyMap {
    vars: HashMap<usize, Var>,
    pub(crate) objects: HashMap<usize, ObjectRef>,
}

impl CopyMap {
    fn var(&mut self, var: &Var) -> Var {
        if let Some(copy) = self.vars.get(&var.addr()) {
            return copy.clone();
        }
        let copy = Var::new(Value::Null);
        self.vars.insert(var.addr(), copy.clone());
        let inner = var.get().deep_copy_with(self);
        copy.set(inner);
        copy
    }
}

/// Iterator over `(key, slot)` pairs in insertion order.
pub struct Iter<'a> {
    data: &'a ArrayData,
    next: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a ArrayKey, &'a Slot);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let entry = &self.data.entries[idx];
        self.next = entry.next;
        Some((&entry.key, &entry.slot))
    }
}

impl<'a> IntoIterator for &'a ArrayValue {
    type Item = (&'a ArrayKey, &'a Slot);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Value> for ArrayValue {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ArrayValue::from_values(iter)
    }
}

impl<K: Into<ArrayKey>> FromIterator<(K, Value)> for ArrayValue {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut array = ArrayValue::new();
        for (k, v) in iter {
            array.put(k, v);
        }
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[i64]) -> ArrayValue {
        values.iter().map(|n| Value::Long(*n)).collect()
    }

    #[test]
    fn test_append_uses_sequential_keys() {
        let a = list(&[10, 20, 30]);
        assert_eq!(a.keys(), vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::Int(2)]);
        assert_eq!(a.next_index(), 3);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut a = ArrayValue::new();
        a.put("x", Value::Long(1));
        a.put("y", Value::Long(2));
        a.put("x", Value::Long(3));
        assert_eq!(a.keys(), vec![ArrayKey::from("x"), ArrayKey::from("y")]);
        assert_eq!(a.get("x"), Some(Value::Long(3)));
    }

    #[test]
    fn test_unset_is_distinct_from_null() {
        let mut a = ArrayValue::new();
        a.put("n", Value::Null);
        assert_eq!(a.get("n"), Some(Value::Null));
        assert_eq!(a.get("missing"), None);
    }

    #[test]
    fn test_explicit_key_moves_tail() {
        let mut a = ArrayValue::new();
        a.put(5, Value::Long(1));
        assert_eq!(a.append(Value::Long(2)), ArrayKey::Int(6));
        a.put(-10, Value::Long(3));
        assert_eq!(a.append(Value::Long(4)), ArrayKey::Int(7));
    }

    #[test]
    fn test_remove_relinks_and_reuses_slot() {
        let mut a = list(&[1, 2, 3]);
        assert_eq!(a.remove(1), Some(Value::Long(2)));
        assert_eq!(a.values(), vec![Value::Long(1), Value::Long(3)]);
        a.put("z", Value::Long(4));
        assert_eq!(a.values(), vec![Value::Long(1), Value::Long(3), Value::Long(4)]);
        assert_eq!(a.data.entries.len(), 3);
    }

    #[test]
    fn test_remove_advances_cursor() {
        let mut a = list(&[1, 2, 3]);
        a.next();
        assert_eq!(a.current(), Some(Value::Long(2)));
        a.remove(1);
        assert_eq!(a.current(), Some(Value::Long(3)));
    }

    #[test]
    fn test_cursor_walk() {
        let mut a = list(&[1, 2]);
        assert_eq!(a.current(), Some(Value::Long(1)));
        assert_eq!(a.next(), Some(Value::Long(2)));
        assert_eq!(a.next(), None);
        assert_eq!(a.key(), None);
        assert_eq!(a.reset(), Some(Value::Long(1)));
        assert_eq!(a.end(), Some(Value::Long(2)));
        assert_eq!(a.prev(), Some(Value::Long(1)));
        assert_eq!(a.prev(), None);
    }

    #[test]
    fn test_cursor_on_empty_array_follows_first_append() {
        let mut a = ArrayValue::new();
        assert_eq!(a.current(), None);
        a.append(Value::Long(7));
        assert_eq!(a.current(), Some(Value::Long(7)));
    }

    #[test]
    fn test_fork_only_when_shared() {
        let mut a = list(&[1]);
        assert!(!a.is_shared());
        let b = a.clone();
        assert!(a.is_shared());
        a.append(Value::Long(2));
        assert!(!a.is_shared());
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_pop_recomputes_tail() {
        let mut a = list(&[1, 2, 3]);
        assert_eq!(a.pop(), Some(Value::Long(3)));
        assert_eq!(a.append(Value::Long(9)), ArrayKey::Int(2));
    }

    #[test]
    fn test_unshift_renumbers_integer_keys() {
        let mut a = ArrayValue::new();
        a.put(5, Value::Long(1));
        a.put("s", Value::Long(2));
        a.unshift(Value::Long(0));
        assert_eq!(
            a.keys(),
            vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::from("s")]
        );
    }

    #[test]
    fn test_key_reset() {
        let mut a = ArrayValue::new();
        a.put(7, Value::Long(1));
        a.put("k", Value::Long(2));
        a.put(3, Value::Long(3));
        a.key_reset(0, false);
        assert_eq!(
            a.keys(),
            vec![ArrayKey::Int(0), ArrayKey::from("k"), ArrayKey::Int(1)]
        );
        assert_eq!(a.next_index(), 2);
    }

    #[test]
    fn test_key_reset_base_and_strict() {
        let mut a = ArrayValue::new();
        a.put(7, Value::Long(1));
        a.put("k", Value::Long(2));
        a.put(3, Value::Long(3));

        a.key_reset(10, false);
        assert_eq!(
            a.keys(),
            vec![ArrayKey::Int(10), ArrayKey::from("k"), ArrayKey::Int(11)]
        );
        assert_eq!(a.next_index(), 12);

        a.key_reset(0, true);
        assert_eq!(
            a.keys(),
            vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::Int(2)]
        );
        assert_eq!(a.values(), vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
        assert_eq!(a.next_index(), 3);
    }

    #[test]
    fn test_sort_by_value() {
        let mut a = list(&[3, 1, 2]);
        a.sort_by(|a, b| a.1.compare(b.1), false);
        assert_eq!(a.keys(), vec![ArrayKey::Int(1), ArrayKey::Int(2), ArrayKey::Int(0)]);
        a.sort_by(|a, b| a.1.compare(b.1), true);
        assert_eq!(a.keys(), vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::Int(2)]);
    }

    #[test]
    fn test_with_array_autovivifies_in_place() {
        let mut a = ArrayValue::new();
        a.with_array("list", |inner| {
            inner.append(Value::Long(1));
        })
        .unwrap();
        a.with_array("list", |inner| {
            inner.append(Value::Long(2));
        })
        .unwrap();
        match a.get("list") {
            Some(Value::Array(inner)) => assert_eq!(inner.len(), 2),
            other => panic!("expected nested array, got {:?}", other),
        }
    }

    #[test]
    fn test_with_array_rejects_scalar() {
        let mut a = ArrayValue::new();
        a.put("n", Value::Long(1));
        assert!(a.with_array("n", |_| ()).is_err());
    }

    #[test]
    fn test_each_pair_shape() {
        let mut a = ArrayValue::new();
        a.put("k", Value::Long(1));
        let pair = a.each().unwrap();
        assert_eq!(pair.get(0), Some(Value::from("k")));
        assert_eq!(pair.get("key"), Some(Value::from("k")));
        assert_eq!(pair.get(1), Some(Value::Long(1)));
        assert_eq!(pair.get("value"), Some(Value::Long(1)));
        assert!(a.each().is_none());
    }

    #[test]
    fn test_contains() {
        let a = list(&[1, 2]);
        assert_eq!(a.contains(&Value::from("2")), Some(ArrayKey::Int(1)));
        assert_eq!(a.contains_strict(&Value::from("2")), None);
        assert_eq!(a.contains_strict(&Value::Long(2)), Some(ArrayKey::Int(1)));
    }

    #[test]
    fn test_union_keeps_left_values() {
        let a = list(&[1, 2]);
        let b = list(&[7, 8, 9]);
        let u = a.union(&b);
        assert_eq!(u.values(), vec![Value::Long(1), Value::Long(2), Value::Long(9)]);
    }

    #[test]
    fn test_deep_copy_duplicates_refs() {
        let mut a = ArrayValue::new();
        let var = a.get_ref("r");
        var.set(Value::Long(1));
        let mut copy = a.deep_copy();
        copy.put("r", Value::Long(2));
        assert_eq!(a.get("r"), Some(Value::Long(1)));
    }

    #[test]
    fn test_deep_copy_preserves_aliasing() {
        let mut a = ArrayValue::new();
        let var = a.get_ref("x");
        a.put_ref("y", var);
        let mut copy = a.deep_copy();
        copy.put("x", Value::Long(5));
        assert_eq!(copy.get("y"), Some(Value::Long(5)));
        assert_eq!(a.get("y"), Some(Value::Null));
    }
}
