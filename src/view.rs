//! Live views over a `LiveMap`: keys, values and entries.
//!
//! A view is only a borrowed reference to its map. Reads go to the map on
//! every call, removals through a view go straight to the map, and
//! insertion through a view is refused.
//!
//! Iterators are fail-fast. Each one records the map's structural
//! modification count when created and re-checks it on every step; after a
//! change made through any channel other than its own `remove_current`,
//! the next step yields `ModificationConflict` once and the iterator ends.
//! Value writes through `Entry::set_value` are not structural.

use crate::error::MapError;
use crate::live_map::LiveMap;
use crate::map::{entry_hash_code, Map, MapEntry};
use crate::raw::RawMap;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Shared traversal state for all view iterators.
struct Cursor<'a, M: RawMap> {
    map: &'a LiveMap<M>,
    slots: std::vec::IntoIter<M::Slot>,
    expected: u64,
    current: Option<M::Slot>,
    done: bool,
}

impl<'a, M: RawMap> Cursor<'a, M> {
    fn new(map: &'a LiveMap<M>) -> Self {
        Self {
            slots: map.slot_snapshot().into_iter(),
            expected: map.mod_count(),
            current: None,
            done: false,
            map,
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), MapError> {
        let found = self.map.mod_count();
        if found != self.expected {
            log::debug!(
                "{operation}: map modified out of band (expected mod count {}, found {found})",
                self.expected
            );
            return Err(MapError::ModificationConflict { operation });
        }
        Ok(())
    }

    fn step(&mut self, operation: &'static str) -> Option<Result<M::Slot, MapError>> {
        if self.done {
            return None;
        }
        if let Err(e) = self.check(operation) {
            self.done = true;
            self.current = None;
            return Some(Err(e));
        }
        match self.slots.next() {
            Some(slot) => {
                self.current = Some(slot);
                Some(Ok(slot))
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    fn remove_current(&mut self, operation: &'static str) -> Result<(), MapError> {
        self.check(operation)?;
        let slot = self.current.take().ok_or(MapError::NoCurrentElement)?;
        let removed = self.map.remove_slot(slot, operation)?;
        self.expected = self.map.mod_count();
        drop(removed);
        Ok(())
    }

    fn read<T, F>(&self, slot: M::Slot, operation: &'static str, project: F) -> Result<T, MapError>
    where
        F: FnOnce(&M::Key, &M::Value) -> T,
    {
        self.map.read_slot(slot, operation, project)
    }
}

fn unsupported(operation: &'static str) -> MapError {
    MapError::Unsupported { operation }
}

/// Handle onto one live mapping of a `LiveMap`.
pub struct Entry<'a, M: RawMap> {
    map: &'a LiveMap<M>,
    slot: M::Slot,
}

impl<M: RawMap> Clone for Entry<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMap> Copy for Entry<'_, M> {}

impl<M> MapEntry for Entry<'_, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    type Key = M::Key;
    type Value = M::Value;

    fn key(&self) -> Result<M::Key, MapError> {
        self.map.read_slot(self.slot, "Entry::key", |k, _| k.clone())
    }

    fn value(&self) -> Result<M::Value, MapError> {
        self.map.read_slot(self.slot, "Entry::value", |_, v| v.clone())
    }

    fn set_value(&self, value: M::Value) -> Result<M::Value, MapError> {
        self.map.set_slot_value(self.slot, value, "Entry::set_value")
    }
}

impl<M> Entry<'_, M>
where
    M: RawMap,
    M::Key: Hash,
    M::Value: Hash,
{
    /// Key hash XOR value hash; 0 once the mapping is gone.
    pub fn hash_code(&self) -> u64 {
        self.map
            .read_slot(self.slot, "Entry::hash_code", |k, v| {
                let v = (!M::is_absence_marker(v)).then_some(v);
                entry_hash_code(Some(k), v)
            })
            .unwrap_or(0)
    }
}

impl<'b, M, O> PartialEq<Entry<'b, O>> for Entry<'_, M>
where
    M: RawMap,
    O: RawMap<Key = M::Key, Value = M::Value>,
    M::Value: PartialEq,
{
    fn eq(&self, other: &Entry<'b, O>) -> bool {
        let mine = self.map.read_slot(self.slot, "Entry::eq", |k, v| {
            other
                .map
                .read_slot(other.slot, "Entry::eq", |ok, ov| {
                    k == ok && v == ov && M::is_absence_marker(v) == O::is_absence_marker(ov)
                })
        });
        matches!(mine, Ok(Ok(true)))
    }
}

impl<M> Hash for Entry<'_, M>
where
    M: RawMap,
    M::Key: Hash,
    M::Value: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<M> fmt::Debug for Entry<'_, M>
where
    M: RawMap,
    M::Key: fmt::Debug,
    M::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.map.read_slot(self.slot, "Entry::fmt", |k, v| {
            f.debug_tuple("Entry").field(k).field(v).finish()
        });
        match shown {
            Ok(res) => res,
            Err(_) => f.write_str("Entry(<removed>)"),
        }
    }
}

/// Keys of a `LiveMap`, in storage order.
pub struct KeysIter<'a, M: RawMap> {
    cursor: Cursor<'a, M>,
}

impl<M> Iterator for KeysIter<'_, M>
where
    M: RawMap,
    M::Key: Clone,
{
    type Item = Result<M::Key, MapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = match self.cursor.step("KeysIter::next")? {
            Ok(slot) => slot,
            Err(e) => return Some(Err(e)),
        };
        Some(self.cursor.read(slot, "KeysIter::next", |k, _| k.clone()))
    }
}

impl<M: RawMap> KeysIter<'_, M> {
    /// Remove the mapping of the key last returned by `next`.
    pub fn remove_current(&mut self) -> Result<(), MapError> {
        self.cursor.remove_current("KeysIter::remove_current")
    }
}

/// Values of a `LiveMap`, in storage order.
pub struct ValuesIter<'a, M: RawMap> {
    cursor: Cursor<'a, M>,
}

impl<M> Iterator for ValuesIter<'_, M>
where
    M: RawMap,
    M::Value: Clone,
{
    type Item = Result<M::Value, MapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = match self.cursor.step("ValuesIter::next")? {
            Ok(slot) => slot,
            Err(e) => return Some(Err(e)),
        };
        Some(self.cursor.read(slot, "ValuesIter::next", |_, v| v.clone()))
    }
}

impl<M: RawMap> ValuesIter<'_, M> {
    /// Remove the mapping whose value was last returned by `next`.
    pub fn remove_current(&mut self) -> Result<(), MapError> {
        self.cursor.remove_current("ValuesIter::remove_current")
    }
}

/// Entry handles of a `LiveMap`, in storage order.
pub struct EntryIter<'a, M: RawMap> {
    cursor: Cursor<'a, M>,
}

impl<'a, M: RawMap> Iterator for EntryIter<'a, M> {
    type Item = Result<Entry<'a, M>, MapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = match self.cursor.step("EntryIter::next")? {
            Ok(slot) => slot,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(Entry {
            map: self.cursor.map,
            slot,
        }))
    }
}

impl<M: RawMap> EntryIter<'_, M> {
    /// Remove the mapping last returned by `next`.
    pub fn remove_current(&mut self) -> Result<(), MapError> {
        self.cursor.remove_current("EntryIter::remove_current")
    }
}

/// Live key-set view.
pub struct KeySet<'a, M> {
    map: &'a LiveMap<M>,
}

impl<'a, M> KeySet<'a, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    pub(crate) fn new(map: &'a LiveMap<M>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &M::Key) -> bool {
        self.map.contains_key(key)
    }

    pub fn iter(&self) -> KeysIter<'a, M> {
        KeysIter {
            cursor: Cursor::new(self.map),
        }
    }

    /// Remove the mapping for `key`; true if one existed.
    pub fn remove(&self, key: &M::Key) -> Result<bool, MapError> {
        Ok(self.map.remove(key)?.is_some())
    }

    pub fn remove_all<'k, I>(&self, keys: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = &'k M::Key>,
        M::Key: 'k,
    {
        self.map.check_writable("KeySet::remove_all")?;
        let mut changed = false;
        for key in keys {
            changed |= self.remove(key)?;
        }
        Ok(changed)
    }

    /// Keep only keys for which `keep` returns true.
    pub fn retain<F>(&self, mut keep: F) -> Result<bool, MapError>
    where
        F: FnMut(&M::Key) -> bool,
    {
        self.map.check_writable("KeySet::retain")?;
        let mut it = self.iter();
        let mut changed = false;
        while let Some(key) = it.next() {
            if !keep(&key?) {
                it.remove_current()?;
                changed = true;
            }
        }
        Ok(changed)
    }

    pub fn retain_all<'k, I>(&self, keys: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = &'k M::Key>,
        M::Key: 'k,
    {
        let keep: Vec<&M::Key> = keys.into_iter().collect();
        self.retain(|k| keep.iter().any(|kk| *kk == k))
    }

    pub fn clear(&self) -> Result<(), MapError> {
        self.map.clear()
    }

    /// Always fails: a key view cannot create mappings.
    pub fn insert(&self, _key: M::Key) -> Result<bool, MapError> {
        Err(unsupported("KeySet::insert"))
    }

    pub fn insert_all<I>(&self, _keys: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = M::Key>,
    {
        Err(unsupported("KeySet::insert_all"))
    }
}

impl<'a, M> IntoIterator for KeySet<'a, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    type Item = Result<M::Key, MapError>;
    type IntoIter = KeysIter<'a, M>;

    fn into_iter(self) -> KeysIter<'a, M> {
        self.iter()
    }
}

/// Live value-collection view.
pub struct Values<'a, M> {
    map: &'a LiveMap<M>,
}

impl<'a, M> Values<'a, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    pub(crate) fn new(map: &'a LiveMap<M>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, value: &M::Value) -> bool
    where
        M::Value: PartialEq,
    {
        self.map.contains_value(value)
    }

    pub fn iter(&self) -> ValuesIter<'a, M> {
        ValuesIter {
            cursor: Cursor::new(self.map),
        }
    }

    /// Remove the first mapping, in traversal order, whose value equals `value`.
    pub fn remove(&self, value: &M::Value) -> Result<bool, MapError>
    where
        M::Value: PartialEq,
    {
        self.map.check_writable("Values::remove")?;
        let mut it = self.iter();
        while let Some(v) = it.next() {
            if v? == *value {
                it.remove_current()?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove every mapping whose value is in `values`.
    pub fn remove_all<'v, I>(&self, values: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = &'v M::Value>,
        M::Value: PartialEq + 'v,
    {
        let drop_these: Vec<&M::Value> = values.into_iter().collect();
        self.retain(|v| !drop_these.iter().any(|d| *d == v))
    }

    pub fn retain<F>(&self, mut keep: F) -> Result<bool, MapError>
    where
        F: FnMut(&M::Value) -> bool,
    {
        self.map.check_writable("Values::retain")?;
        let mut it = self.iter();
        let mut changed = false;
        while let Some(value) = it.next() {
            if !keep(&value?) {
                it.remove_current()?;
                changed = true;
            }
        }
        Ok(changed)
    }

    pub fn retain_all<'v, I>(&self, values: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = &'v M::Value>,
        M::Value: PartialEq + 'v,
    {
        let keep: Vec<&M::Value> = values.into_iter().collect();
        self.retain(|v| keep.iter().any(|k| *k == v))
    }

    pub fn clear(&self) -> Result<(), MapError> {
        self.map.clear()
    }

    /// Always fails: a value view cannot create mappings.
    pub fn insert(&self, _value: M::Value) -> Result<bool, MapError> {
        Err(unsupported("Values::insert"))
    }

    pub fn insert_all<I>(&self, _values: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = M::Value>,
    {
        Err(unsupported("Values::insert_all"))
    }
}

impl<'a, M> IntoIterator for Values<'a, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    type Item = Result<M::Value, MapError>;
    type IntoIter = ValuesIter<'a, M>;

    fn into_iter(self) -> ValuesIter<'a, M> {
        self.iter()
    }
}

/// Live entry-set view.
pub struct EntrySet<'a, M> {
    map: &'a LiveMap<M>,
}

impl<'a, M> EntrySet<'a, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    pub(crate) fn new(map: &'a LiveMap<M>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True if `key` is present and mapped to a value equal to `value`.
    pub fn contains(&self, key: &M::Key, value: &M::Value) -> bool
    where
        M::Value: PartialEq,
    {
        self.map.get(key).map(|v| v == *value).unwrap_or(false)
    }

    pub fn iter(&self) -> EntryIter<'a, M> {
        EntryIter {
            cursor: Cursor::new(self.map),
        }
    }

    /// Remove the mapping only if it is exactly `(key, value)`.
    pub fn remove(&self, key: &M::Key, value: &M::Value) -> Result<bool, MapError>
    where
        M::Value: PartialEq,
    {
        self.map.remove_if_eq(key, value)
    }

    pub fn remove_all<'e, I>(&self, pairs: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = (&'e M::Key, &'e M::Value)>,
        M::Key: 'e,
        M::Value: PartialEq + 'e,
    {
        self.map.check_writable("EntrySet::remove_all")?;
        let mut changed = false;
        for (k, v) in pairs {
            changed |= self.remove(k, v)?;
        }
        Ok(changed)
    }

    pub fn retain<F>(&self, mut keep: F) -> Result<bool, MapError>
    where
        F: FnMut(&M::Key, &M::Value) -> bool,
    {
        self.map.check_writable("EntrySet::retain")?;
        let mut it = self.iter();
        let mut changed = false;
        while let Some(entry) = it.next() {
            let entry = entry?;
            let (k, v) = (entry.key()?, entry.value()?);
            if !keep(&k, &v) {
                it.remove_current()?;
                changed = true;
            }
        }
        Ok(changed)
    }

    pub fn retain_all<'e, I>(&self, pairs: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = (&'e M::Key, &'e M::Value)>,
        M::Key: 'e,
        M::Value: PartialEq + 'e,
    {
        let keep: Vec<(&M::Key, &M::Value)> = pairs.into_iter().collect();
        self.retain(|k, v| keep.iter().any(|(kk, vv)| *kk == k && *vv == v))
    }

    pub fn clear(&self) -> Result<(), MapError> {
        self.map.clear()
    }

    /// Always fails: an entry view cannot create mappings.
    pub fn insert(&self, _key: M::Key, _value: M::Value) -> Result<bool, MapError> {
        Err(unsupported("EntrySet::insert"))
    }

    pub fn insert_all<I>(&self, _pairs: I) -> Result<bool, MapError>
    where
        I: IntoIterator<Item = (M::Key, M::Value)>,
    {
        Err(unsupported("EntrySet::insert_all"))
    }
}

impl<'a, M> IntoIterator for EntrySet<'a, M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    type Item = Result<Entry<'a, M>, MapError>;
    type IntoIter = EntryIter<'a, M>;

    fn into_iter(self) -> EntryIter<'a, M> {
        self.iter()
    }
}
