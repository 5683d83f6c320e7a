//! The `Map` trait: primitive operations plus the derived algebra.
//!
//! Every provided method below is a fixed sequence of primitive calls
//! (`get`, `put`, `remove`, `contains_key`, `entry_iter`) and caller
//! closures. None of them is atomic. An implementation that can do better
//! (e.g. a single locked `compute_if_absent`) overrides the method and
//! documents the stronger guarantee; it must keep the observable effect
//! described here.
//!
//! Closures return `Option<V>`: `None` is the absence marker. A `Some(v)`
//! where `v` is itself the map's absence marker counts as `None`. The
//! `try_*` forms take fallible closures; an `Err` from the closure is
//! returned unchanged and nothing is written on its behalf.

use crate::error::MapError;
use core::cmp::Ordering;
use core::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::collections::hash_map::DefaultHasher;

/// A handle onto one live mapping, produced by a map's entry traversal.
///
/// Accessors fail with `ModificationConflict` once the mapping is gone.
pub trait MapEntry {
    type Key;
    type Value;

    fn key(&self) -> Result<Self::Key, MapError>;

    fn value(&self) -> Result<Self::Value, MapError>;

    /// Write through to the backing map. This is not a structural change.
    fn set_value(&self, value: Self::Value) -> Result<Self::Value, MapError>;
}

/// Mutable associative container.
///
/// All operations take `&self`; implementations use interior mutability
/// and must not hold internal borrows while a caller closure runs.
pub trait Map {
    type Key;
    type Value;
    type Entry<'a>: MapEntry<Key = Self::Key, Value = Self::Value>
    where
        Self: 'a;
    /// Fail-fast traversal of the entries view.
    type EntryIter<'a>: Iterator<Item = Result<Self::Entry<'a>, MapError>>
    where
        Self: 'a;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &Self::Key) -> bool;

    fn contains_value(&self, value: &Self::Value) -> bool
    where
        Self::Value: PartialEq;

    /// `None` means no mapping. A key mapped to the absence marker returns
    /// `Some(marker)`.
    fn get(&self, key: &Self::Key) -> Option<Self::Value>;

    /// Insert or overwrite; returns the previous value.
    fn put(&self, key: Self::Key, value: Self::Value) -> Result<Option<Self::Value>, MapError>;

    /// Remove the mapping if present; returns the removed value.
    fn remove(&self, key: &Self::Key) -> Result<Option<Self::Value>, MapError>;

    fn clear(&self) -> Result<(), MapError>;

    fn entry_iter(&self) -> Self::EntryIter<'_>;

    fn is_read_only(&self) -> bool {
        false
    }

    /// Whether `value` is the absence marker for this map.
    fn is_absence_marker(&self, _value: &Self::Value) -> bool {
        false
    }

    /// `get(key)` when the key is present (even if mapped to the absence
    /// marker), `fallback` otherwise.
    fn get_or_default(&self, key: &Self::Key, fallback: Self::Value) -> Self::Value {
        match self.get(key) {
            Some(v) => v,
            None => fallback,
        }
    }

    /// Copy every mapping of `other` into `self`.
    fn put_all<O>(&self, other: &O) -> Result<(), MapError>
    where
        O: Map<Key = Self::Key, Value = Self::Value> + ?Sized,
    {
        ensure_writable(self, "put_all")?;
        for entry in other.entry_iter() {
            let entry = entry?;
            self.put(entry.key()?, entry.value()?)?;
        }
        Ok(())
    }

    fn for_each<F>(&self, mut action: F) -> Result<(), MapError>
    where
        F: FnMut(&Self::Key, &Self::Value),
    {
        self.try_for_each(|k, v| {
            action(k, v);
            Ok::<(), MapError>(())
        })
    }

    /// Visit every entry in traversal order, stopping at the first error.
    fn try_for_each<F, E>(&self, mut action: F) -> Result<(), E>
    where
        F: FnMut(&Self::Key, &Self::Value) -> Result<(), E>,
        E: From<MapError>,
    {
        for entry in self.entry_iter() {
            let entry = entry?;
            let (k, v) = (entry.key()?, entry.value()?);
            action(&k, &v)?;
        }
        Ok(())
    }

    fn replace_all<F>(&self, mut function: F) -> Result<(), MapError>
    where
        F: FnMut(&Self::Key, Self::Value) -> Self::Value,
    {
        self.try_replace_all(|k, v| Ok::<_, MapError>(function(k, v)))
    }

    /// Replace each value with `function(key, value)` in one pass, writing
    /// through each entry. Entries already rewritten before an error keep
    /// their new values.
    fn try_replace_all<F, E>(&self, mut function: F) -> Result<(), E>
    where
        F: FnMut(&Self::Key, Self::Value) -> Result<Self::Value, E>,
        E: From<MapError>,
    {
        ensure_writable(self, "replace_all")?;
        for entry in self.entry_iter() {
            let entry = entry?;
            let (k, v) = (entry.key()?, entry.value()?);
            let new_value = function(&k, v)?;
            entry.set_value(new_value)?;
        }
        Ok(())
    }

    /// Store `value` unless the key holds a real value. Returns the current
    /// real value when nothing was written, else the previous value (`None`
    /// or the absence marker).
    fn put_if_absent(
        &self,
        key: Self::Key,
        value: Self::Value,
    ) -> Result<Option<Self::Value>, MapError> {
        ensure_writable(self, "put_if_absent")?;
        match live_value(self, &key) {
            Some(current) => Ok(Some(current)),
            None => self.put(key, value),
        }
    }

    /// Remove the mapping only if the key is present with a value equal to
    /// `value`.
    fn remove_if_eq(&self, key: &Self::Key, value: &Self::Value) -> Result<bool, MapError>
    where
        Self::Value: PartialEq,
    {
        ensure_writable(self, "remove_if_eq")?;
        match self.get(key) {
            Some(current) if current == *value => {
                self.remove(key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Overwrite with `new_value` only if the key is present with a value
    /// equal to `old_value`.
    fn replace_if_eq(
        &self,
        key: Self::Key,
        old_value: &Self::Value,
        new_value: Self::Value,
    ) -> Result<bool, MapError>
    where
        Self::Value: PartialEq,
    {
        ensure_writable(self, "replace_if_eq")?;
        match self.get(&key) {
            Some(current) if current == *old_value => {
                self.put(key, new_value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Overwrite only if the key is present; returns the previous value.
    fn replace(&self, key: Self::Key, value: Self::Value) -> Result<Option<Self::Value>, MapError> {
        ensure_writable(self, "replace")?;
        if self.contains_key(&key) {
            self.put(key, value)
        } else {
            Ok(None)
        }
    }

    fn compute_if_absent<F>(&self, key: Self::Key, f: F) -> Result<Option<Self::Value>, MapError>
    where
        F: FnOnce(&Self::Key) -> Option<Self::Value>,
        Self::Value: Clone,
    {
        self.try_compute_if_absent(key, |k| Ok(f(k)))
    }

    /// If the key has no real value, store `f(key)` unless it is the
    /// absence marker. `f` is not called when a real value is present; that
    /// value is returned instead.
    fn try_compute_if_absent<F, E>(&self, key: Self::Key, f: F) -> Result<Option<Self::Value>, E>
    where
        F: FnOnce(&Self::Key) -> Result<Option<Self::Value>, E>,
        E: From<MapError>,
        Self::Value: Clone,
    {
        ensure_writable(self, "compute_if_absent")?;
        if let Some(current) = live_value(self, &key) {
            return Ok(Some(current));
        }
        match real(self, f(&key)?) {
            Some(new_value) => {
                self.put(key, new_value.clone())?;
                Ok(Some(new_value))
            }
            None => Ok(None),
        }
    }

    fn compute_if_present<F>(&self, key: Self::Key, f: F) -> Result<Option<Self::Value>, MapError>
    where
        F: FnOnce(&Self::Key, Self::Value) -> Option<Self::Value>,
        Self::Value: Clone,
    {
        self.try_compute_if_present(key, |k, v| Ok(f(k, v)))
    }

    /// If the key has a real value, replace it with `f(key, value)`, or
    /// remove the mapping when the result is the absence marker. `f` is not
    /// called otherwise.
    fn try_compute_if_present<F, E>(&self, key: Self::Key, f: F) -> Result<Option<Self::Value>, E>
    where
        F: FnOnce(&Self::Key, Self::Value) -> Result<Option<Self::Value>, E>,
        E: From<MapError>,
        Self::Value: Clone,
    {
        ensure_writable(self, "compute_if_present")?;
        let Some(old_value) = live_value(self, &key) else {
            return Ok(None);
        };
        match real(self, f(&key, old_value)?) {
            Some(new_value) => {
                self.put(key, new_value.clone())?;
                Ok(Some(new_value))
            }
            None => {
                self.remove(&key)?;
                Ok(None)
            }
        }
    }

    fn compute<F>(&self, key: Self::Key, f: F) -> Result<Option<Self::Value>, MapError>
    where
        F: FnOnce(&Self::Key, Option<Self::Value>) -> Option<Self::Value>,
        Self::Value: Clone,
    {
        self.try_compute(key, |k, v| Ok(f(k, v)))
    }

    /// Store `f(key, current)` where `current` is the real value or `None`.
    /// An absence-marker result removes an existing mapping and is a no-op
    /// for a missing key.
    fn try_compute<F, E>(&self, key: Self::Key, f: F) -> Result<Option<Self::Value>, E>
    where
        F: FnOnce(&Self::Key, Option<Self::Value>) -> Result<Option<Self::Value>, E>,
        E: From<MapError>,
        Self::Value: Clone,
    {
        ensure_writable(self, "compute")?;
        let old_value = self.get(&key);
        let existed = old_value.is_some();
        let current = real(self, old_value);
        match real(self, f(&key, current)?) {
            Some(new_value) => {
                self.put(key, new_value.clone())?;
                Ok(Some(new_value))
            }
            None => {
                if existed {
                    self.remove(&key)?;
                }
                Ok(None)
            }
        }
    }

    fn merge<F>(&self, key: Self::Key, value: Self::Value, f: F) -> Result<Option<Self::Value>, MapError>
    where
        F: FnOnce(Self::Value, Self::Value) -> Option<Self::Value>,
        Self::Value: Clone,
    {
        self.try_merge(key, value, |old, new| Ok(f(old, new)))
    }

    /// Store `value` if the key has no real value, otherwise
    /// `f(current, value)`; an absence-marker result removes the mapping.
    /// `value` itself must not be the absence marker.
    fn try_merge<F, E>(&self, key: Self::Key, value: Self::Value, f: F) -> Result<Option<Self::Value>, E>
    where
        F: FnOnce(Self::Value, Self::Value) -> Result<Option<Self::Value>, E>,
        E: From<MapError>,
        Self::Value: Clone,
    {
        ensure_writable(self, "merge")?;
        if self.is_absence_marker(&value) {
            return Err(MapError::InvalidArgument {
                what: "merge value must not be the absence marker",
            }
            .into());
        }
        let merged = match live_value(self, &key) {
            None => Some(value),
            Some(old_value) => real(self, f(old_value, value)?),
        };
        match merged {
            Some(new_value) => {
                self.put(key, new_value.clone())?;
                Ok(Some(new_value))
            }
            None => {
                self.remove(&key)?;
                Ok(None)
            }
        }
    }

    /// Entry-set equality: same size and every `(key, value)` of `self` is
    /// present in `other`, with both sides agreeing on whether the value is
    /// an absence marker. A traversal conflict compares unequal.
    fn entries_equal<O>(&self, other: &O) -> bool
    where
        O: Map<Key = Self::Key, Value = Self::Value> + ?Sized,
        Self::Value: PartialEq,
    {
        if self.len() != other.len() {
            return false;
        }
        for entry in self.entry_iter() {
            let Ok(entry) = entry else { return false };
            let (Ok(k), Ok(v)) = (entry.key(), entry.value()) else {
                return false;
            };
            let Some(ov) = other.get(&k) else { return false };
            if ov != v || self.is_absence_marker(&v) != other.is_absence_marker(&ov) {
                return false;
            }
        }
        true
    }

    /// Sum of entry hash codes; equal maps hash equally regardless of layout
    /// or traversal order.
    fn hash_code(&self) -> u64
    where
        Self::Key: Hash,
        Self::Value: Hash,
    {
        let mut sum = 0u64;
        for entry in self.entry_iter() {
            let Ok(entry) = entry else { break };
            if let (Ok(k), Ok(v)) = (entry.key(), entry.value()) {
                let v = (!self.is_absence_marker(&v)).then_some(&v);
                sum = sum.wrapping_add(entry_hash_code(Some(&k), v));
            }
        }
        sum
    }
}

/// Current value of `key` unless missing or the absence marker.
fn live_value<M: Map + ?Sized>(map: &M, key: &M::Key) -> Option<M::Value> {
    real(map, map.get(key))
}

fn real<M: Map + ?Sized>(map: &M, value: Option<M::Value>) -> Option<M::Value> {
    value.filter(|v| !map.is_absence_marker(v))
}

fn ensure_writable<M: Map + ?Sized>(map: &M, operation: &'static str) -> Result<(), MapError> {
    if map.is_read_only() {
        log::debug!("read-only map rejected {operation}");
        return Err(MapError::Unsupported { operation });
    }
    Ok(())
}

type StableHasher = BuildHasherDefault<DefaultHasher>;

/// Hash of one `(key, value)` pair: key hash XOR value hash, with 0 standing
/// in for a missing key or an absence-marker value. Stable within a build,
/// so entries from different maps and views agree.
pub fn entry_hash_code<K: Hash + ?Sized, V: Hash + ?Sized>(key: Option<&K>, value: Option<&V>) -> u64 {
    let hasher = StableHasher::default();
    let kh = key.map_or(0, |k| hasher.hash_one(k));
    let vh = value.map_or(0, |v| hasher.hash_one(v));
    kh ^ vh
}

/// Order entries by key. Entries whose key cannot be read sort last.
pub fn comparing_by_key<E>(a: &E, b: &E) -> Ordering
where
    E: MapEntry,
    E::Key: Ord,
{
    comparing_by_key_with(a, b, Ord::cmp)
}

/// Order entries by value. Entries whose value cannot be read sort last.
pub fn comparing_by_value<E>(a: &E, b: &E) -> Ordering
where
    E: MapEntry,
    E::Value: Ord,
{
    comparing_by_value_with(a, b, Ord::cmp)
}

pub fn comparing_by_key_with<E, C>(a: &E, b: &E, mut cmp: C) -> Ordering
where
    E: MapEntry,
    C: FnMut(&E::Key, &E::Key) -> Ordering,
{
    match (a.key(), b.key()) {
        (Ok(x), Ok(y)) => cmp(&x, &y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}

pub fn comparing_by_value_with<E, C>(a: &E, b: &E, mut cmp: C) -> Ordering
where
    E: MapEntry,
    C: FnMut(&E::Value, &E::Value) -> Ordering,
{
    match (a.value(), b.value()) {
        (Ok(x), Ok(y)) => cmp(&x, &y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}
