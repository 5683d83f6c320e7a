//! HandleHashMap: hashed storage strategy with stable generational handles.
//!
//! Buckets live in a `SlotMap`; a `HashTable` of slot keys indexes them by
//! the hash cached in each bucket, so stored keys are never re-hashed.
//! Overwriting a key replaces the value in place and keeps its handle.

use crate::raw::RawMap;
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable name for one stored mapping. Stops resolving once the mapping is
/// removed and never resolves to a mapping inserted later.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

#[derive(Clone, Debug)]
struct Bucket<K, V> {
    key: K,
    value: V,
    hash: u64,
}

#[derive(Clone)]
pub struct HandleHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    buckets: SlotMap<DefaultKey, Bucket<K, V>>,
    reentrancy: DebugReentrancy,
}

impl<K, V> HandleHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V, S> Default for HandleHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

/// `(handle, key, value)` for every mapping, in slot order.
pub struct Iter<'a, K, V> {
    inner: slotmap::basic::Iter<'a, DefaultKey, Bucket<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (slot, bucket) = self.inner.next()?;
        Some((Handle(slot), &bucket.key, &bucket.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Live handles, in slot order.
pub struct Handles<'a, K, V> {
    inner: slotmap::basic::Keys<'a, DefaultKey, Bucket<K, V>>,
}

impl<K, V> Iterator for Handles<'_, K, V> {
    type Item = Handle;

    #[inline]
    fn next(&mut self) -> Option<Handle> {
        self.inner.next().map(Handle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Index probe predicate: the slot holds a key equal to `q`.
fn holds<'s, K, V, Q>(
    buckets: &'s SlotMap<DefaultKey, Bucket<K, V>>,
    q: &'s Q,
) -> impl Fn(&DefaultKey) -> bool + 's
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    move |slot: &DefaultKey| buckets.get(*slot).is_some_and(|b| b.key.borrow() == q)
}

impl<K, V, S> HandleHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            buckets: SlotMap::with_capacity_and_key(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("find");
        let hash = self.hasher.hash_one(q);
        let slot = self.index.find(hash, holds(&self.buckets, q))?;
        Some(Handle(*slot))
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.find(q)?;
        self.value_of(handle)
    }

    /// Insert `key -> value`, or overwrite the value of an existing key in
    /// place. Returns the previous value when the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter("insert");
        let hash = self.hasher.hash_one(&key);
        let present = self.index.find(hash, holds(&self.buckets, &key)).copied();
        if let Some(bucket) = present.and_then(|slot| self.buckets.get_mut(slot)) {
            return Some(core::mem::replace(&mut bucket.value, value));
        }

        let slot = self.buckets.insert(Bucket { key, value, hash });
        let buckets = &self.buckets;
        self.index.insert_unique(hash, slot, |s| {
            buckets.get(*s).map_or(0, |b| b.hash)
        });
        None
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.find(q)?;
        self.remove_handle(handle)
    }

    /// Remove the mapping named by `handle`; `None` if it is already gone.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let _g = self.reentrancy.enter("remove_handle");
        let Handle(slot) = handle;
        let bucket = self.buckets.remove(slot)?;
        // The index entry is located by slot identity, not by key equality.
        if let Ok(found) = self.index.find_entry(bucket.hash, |s| *s == slot) {
            let _ = found.remove();
        }
        Some((bucket.key, bucket.value))
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter("clear");
        self.index.clear();
        self.buckets.clear();
    }

    /// Empty the map, returning its mappings in slot order.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let _g = self.reentrancy.enter("drain");
        self.index.clear();
        self.buckets.drain().map(|(_, b)| (b.key, b.value)).collect()
    }

    pub fn key_of(&self, handle: Handle) -> Option<&K> {
        self.entry_of(handle).map(|(k, _)| k)
    }

    pub fn value_of(&self, handle: Handle) -> Option<&V> {
        self.entry_of(handle).map(|(_, v)| v)
    }

    pub fn entry_of(&self, handle: Handle) -> Option<(&K, &V)> {
        let bucket = self.buckets.get(handle.0)?;
        Some((&bucket.key, &bucket.value))
    }

    pub fn value_of_mut(&mut self, handle: Handle) -> Option<&mut V> {
        self.buckets.get_mut(handle.0).map(|b| &mut b.value)
    }

    pub fn handles(&self) -> Handles<'_, K, V> {
        Handles {
            inner: self.buckets.keys(),
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.buckets.iter(),
        }
    }
}

impl<K, V, S> RawMap for HandleHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    type Key = K;
    type Value = V;
    type Slot = Handle;
    type Slots<'a>
        = Handles<'a, K, V>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn find(&self, key: &K) -> Option<Handle> {
        HandleHashMap::find(self, key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        HandleHashMap::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        HandleHashMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<(K, V)> {
        HandleHashMap::remove(self, key)
    }

    fn clear(&mut self) {
        HandleHashMap::clear(self)
    }

    fn drain(&mut self) -> Vec<(K, V)> {
        HandleHashMap::drain(self)
    }

    fn slots(&self) -> Handles<'_, K, V> {
        self.handles()
    }

    fn slot(&self, slot: Handle) -> Option<(&K, &V)> {
        self.entry_of(slot)
    }

    fn slot_value_mut(&mut self, slot: Handle) -> Option<&mut V> {
        self.value_of_mut(slot)
    }

    fn remove_slot(&mut self, slot: Handle) -> Option<(K, V)> {
        self.remove_handle(slot)
    }
}
