//! LiveMap: the container over any `RawMap` storage.
//!
//! Storage sits in a `RefCell`; every operation borrows it for one
//! primitive call and releases it before returning, so caller closures in
//! the derived operations can freely read or mutate the same map. Keys and
//! values removed by `put`, `remove`, `clear` or a view are dropped after
//! the borrow ends.
//!
//! A structural modification counter is bumped whenever the key set
//! changes (fresh insert, removal, non-empty clear). View iterators capture
//! it and compare on every step. That is best-effort misuse detection for
//! a single thread, not a synchronization mechanism.

use crate::error::MapError;
use crate::handle_hash_map::HandleHashMap;
use crate::linear_map::LinearMap;
use crate::map::Map;
use crate::raw::{NoAbsence, RawMap};
use crate::view::{Entry, EntryIter, EntrySet, KeySet, Values};
use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::hash_map::RandomState;

/// `LiveMap` over hashed storage.
pub type LiveHashMap<K, V, S = RandomState> = LiveMap<HandleHashMap<K, V, S>>;

/// `LiveMap` over insertion-ordered storage.
pub type LiveLinearMap<K, V, P = NoAbsence> = LiveMap<LinearMap<K, V, P>>;

pub struct LiveMap<M> {
    raw: RefCell<M>,
    mod_count: Cell<u64>,
    read_only: bool,
}

impl<M> LiveMap<M>
where
    M: RawMap + Default,
{
    pub fn new() -> Self {
        Self::with_storage(M::default())
    }

    /// Copy every current mapping of `other` into a new map. The copy shares
    /// nothing with `other`.
    pub fn copy_of<O>(other: &O) -> Result<Self, MapError>
    where
        O: Map<Key = M::Key, Value = M::Value> + ?Sized,
        M::Key: Clone,
        M::Value: Clone,
    {
        let map = Self::new();
        map.put_all(other)?;
        Ok(map)
    }
}

impl<M> Default for LiveMap<M>
where
    M: RawMap + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> LiveMap<M>
where
    M: RawMap,
{
    /// Adopt existing storage with its current mappings.
    pub fn with_storage(raw: M) -> Self {
        Self {
            raw: RefCell::new(raw),
            mod_count: Cell::new(0),
            read_only: false,
        }
    }

    /// Refuse every later mutation with `MapError::Unsupported`.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn into_inner(self) -> M {
        self.raw.into_inner()
    }

    pub(crate) fn mod_count(&self) -> u64 {
        self.mod_count.get()
    }

    fn bump(&self) {
        self.mod_count.set(self.mod_count.get().wrapping_add(1));
    }

    pub(crate) fn check_writable(&self, operation: &'static str) -> Result<(), MapError> {
        if self.read_only {
            log::debug!("read-only map rejected {operation}");
            return Err(MapError::Unsupported { operation });
        }
        Ok(())
    }

    pub(crate) fn slot_snapshot(&self) -> Vec<M::Slot> {
        self.raw.borrow().slots().collect()
    }

    pub(crate) fn read_slot<T, F>(
        &self,
        slot: M::Slot,
        operation: &'static str,
        project: F,
    ) -> Result<T, MapError>
    where
        F: FnOnce(&M::Key, &M::Value) -> T,
    {
        let raw = self.raw.borrow();
        raw.slot(slot)
            .map(|(k, v)| project(k, v))
            .ok_or(MapError::ModificationConflict { operation })
    }

    /// Structural removal through a view or iterator.
    pub(crate) fn remove_slot(
        &self,
        slot: M::Slot,
        operation: &'static str,
    ) -> Result<(M::Key, M::Value), MapError> {
        self.check_writable(operation)?;
        let removed = self.raw.borrow_mut().remove_slot(slot);
        match removed {
            Some(pair) => {
                self.bump();
                Ok(pair)
            }
            None => Err(MapError::ModificationConflict { operation }),
        }
    }

    /// Value write through an entry; never structural.
    pub(crate) fn set_slot_value(
        &self,
        slot: M::Slot,
        value: M::Value,
        operation: &'static str,
    ) -> Result<M::Value, MapError> {
        self.check_writable(operation)?;
        let mut raw = self.raw.borrow_mut();
        match raw.slot_value_mut(slot) {
            Some(current) => Ok(core::mem::replace(current, value)),
            None => Err(MapError::ModificationConflict { operation }),
        }
    }
}

impl<M> LiveMap<M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    /// Live view of the keys.
    pub fn keys(&self) -> KeySet<'_, M> {
        KeySet::new(self)
    }

    /// Live view of the values.
    pub fn values(&self) -> Values<'_, M> {
        Values::new(self)
    }

    /// Live view of the mappings.
    pub fn entries(&self) -> EntrySet<'_, M> {
        EntrySet::new(self)
    }
}

impl<M> Map for LiveMap<M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone,
{
    type Key = M::Key;
    type Value = M::Value;
    type Entry<'a>
        = Entry<'a, M>
    where
        Self: 'a;
    type EntryIter<'a>
        = EntryIter<'a, M>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.raw.borrow().len()
    }

    fn contains_key(&self, key: &M::Key) -> bool {
        self.raw.borrow().contains_key(key)
    }

    fn contains_value(&self, value: &M::Value) -> bool
    where
        M::Value: PartialEq,
    {
        let raw = self.raw.borrow();
        let found = raw
            .slots()
            .any(|s| raw.slot(s).map(|(_, v)| v == value).unwrap_or(false));
        found
    }

    fn get(&self, key: &M::Key) -> Option<M::Value> {
        self.raw.borrow().get(key).cloned()
    }

    fn put(&self, key: M::Key, value: M::Value) -> Result<Option<M::Value>, MapError> {
        self.check_writable("put")?;
        let previous = self.raw.borrow_mut().insert(key, value);
        if previous.is_none() {
            self.bump();
        }
        Ok(previous)
    }

    fn remove(&self, key: &M::Key) -> Result<Option<M::Value>, MapError> {
        self.check_writable("remove")?;
        let removed = self.raw.borrow_mut().remove(key);
        match removed {
            Some((_, value)) => {
                self.bump();
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<(), MapError> {
        self.check_writable("clear")?;
        let removed = {
            let mut raw = self.raw.borrow_mut();
            if raw.is_empty() {
                return Ok(());
            }
            raw.drain()
        };
        self.bump();
        log::trace!("cleared {} mappings", removed.len());
        drop(removed);
        Ok(())
    }

    fn entry_iter(&self) -> EntryIter<'_, M> {
        self.entries().iter()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_absence_marker(&self, value: &M::Value) -> bool {
        M::is_absence_marker(value)
    }
}

impl<M, O> PartialEq<LiveMap<O>> for LiveMap<M>
where
    M: RawMap,
    O: RawMap<Key = M::Key, Value = M::Value>,
    M::Key: Clone,
    M::Value: Clone + PartialEq,
{
    fn eq(&self, other: &LiveMap<O>) -> bool {
        self.entries_equal(other)
    }
}

impl<M> Eq for LiveMap<M>
where
    M: RawMap,
    M::Key: Clone,
    M::Value: Clone + Eq,
{
}

impl<M> Hash for LiveMap<M>
where
    M: RawMap,
    M::Key: Clone + Hash,
    M::Value: Clone + Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<M> Clone for LiveMap<M>
where
    M: RawMap + Clone,
{
    fn clone(&self) -> Self {
        Self {
            raw: RefCell::new(self.raw.borrow().clone()),
            mod_count: Cell::new(0),
            read_only: self.read_only,
        }
    }
}

impl<M> fmt::Debug for LiveMap<M>
where
    M: RawMap,
    M::Key: fmt::Debug,
    M::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.raw.borrow();
        f.debug_map()
            .entries(raw.slots().filter_map(|s| raw.slot(s)))
            .finish()
    }
}

impl<M> FromIterator<(M::Key, M::Value)> for LiveMap<M>
where
    M: RawMap + Default,
{
    fn from_iter<I: IntoIterator<Item = (M::Key, M::Value)>>(iter: I) -> Self {
        let mut raw = M::default();
        for (k, v) in iter {
            raw.insert(k, v);
        }
        Self::with_storage(raw)
    }
}
