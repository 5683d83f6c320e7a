//! LinearMap: insertion-ordered storage for keys that are only `Eq`.
//!
//! Lookups scan the order vector, so every keyed operation is O(n). Meant
//! for small maps and for key types without a `Hash`.
//! Removal shifts the order vector, so iteration stays in insertion order;
//! overwriting a key keeps its position.

use crate::raw::{AbsencePolicy, NoAbsence, RawMap};
use crate::reentrancy::DebugReentrancy;
use core::marker::PhantomData;
use slotmap::{DefaultKey, SlotMap};

/// Generational handle to one `LinearMap` mapping.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LinearSlot(DefaultKey);

#[derive(Clone)]
pub struct LinearMap<K, V, P = NoAbsence> {
    order: Vec<DefaultKey>,
    slots: SlotMap<DefaultKey, (K, V)>,
    reentrancy: DebugReentrancy,
    _policy: PhantomData<fn() -> P>,
}

impl<K, V, P> LinearMap<K, V, P> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
            reentrancy: DebugReentrancy::new(),
            _policy: PhantomData,
        }
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|&k| self.slots.get(k).map(|(key, value)| (key, value)))
    }
}

impl<K, V, P> Default for LinearMap<K, V, P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Live slots of a `LinearMap`, in insertion order.
pub struct LinearSlots<'a> {
    it: core::slice::Iter<'a, DefaultKey>,
}

impl Iterator for LinearSlots<'_> {
    type Item = LinearSlot;
    #[inline]
    fn next(&mut self) -> Option<LinearSlot> {
        self.it.next().map(|&k| LinearSlot(k))
    }
}

impl<K, V, P> RawMap for LinearMap<K, V, P>
where
    K: Eq,
    P: AbsencePolicy<V>,
{
    type Key = K;
    type Value = V;
    type Slot = LinearSlot;
    type Slots<'a>
        = LinearSlots<'a>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.order.len()
    }

    fn find(&self, key: &K) -> Option<LinearSlot> {
        let _g = self.reentrancy.enter("find");
        self.order
            .iter()
            .copied()
            .find(|&k| self.slots.get(k).map(|(sk, _)| sk == key).unwrap_or(false))
            .map(LinearSlot)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(LinearSlot(k)) = self.find(&key) {
            let _g = self.reentrancy.enter("insert");
            return self
                .slots
                .get_mut(k)
                .map(|(_, v)| core::mem::replace(v, value));
        }
        let _g = self.reentrancy.enter("insert");
        let k = self.slots.insert((key, value));
        self.order.push(k);
        None
    }

    fn clear(&mut self) {
        let _g = self.reentrancy.enter("clear");
        self.order.clear();
        self.slots.clear();
    }

    fn drain(&mut self) -> Vec<(K, V)> {
        let _g = self.reentrancy.enter("drain");
        let order = core::mem::take(&mut self.order);
        let out = order
            .into_iter()
            .filter_map(|k| self.slots.remove(k))
            .collect();
        out
    }

    fn slots(&self) -> LinearSlots<'_> {
        LinearSlots {
            it: self.order.iter(),
        }
    }

    fn slot(&self, slot: LinearSlot) -> Option<(&K, &V)> {
        self.slots.get(slot.0).map(|(k, v)| (k, v))
    }

    fn slot_value_mut(&mut self, slot: LinearSlot) -> Option<&mut V> {
        self.slots.get_mut(slot.0).map(|(_, v)| v)
    }

    fn remove_slot(&mut self, slot: LinearSlot) -> Option<(K, V)> {
        let _g = self.reentrancy.enter("remove");
        let pos = self.order.iter().position(|&k| k == slot.0)?;
        self.order.remove(pos);
        self.slots.remove(slot.0)
    }

    fn is_absence_marker(value: &V) -> bool {
        P::is_absence_marker(value)
    }
}
