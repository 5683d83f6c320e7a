//! RawMap: the primitive contract a storage strategy provides.
//!
//! Everything in `map` and `view` is built from these calls alone. A
//! strategy decides layout, hashing and iteration order; it only has to
//! keep keys unique and hand out generational slot handles that stop
//! resolving once their slot is removed.

/// Declares whether some stored values are the absence marker.
///
/// The derived operations treat a key mapped to the absence marker exactly
/// like a missing key when checking for presence.
pub trait AbsencePolicy<V> {
    fn is_absence_marker(value: &V) -> bool;
}

/// Values are never the absence marker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoAbsence;

impl<V> AbsencePolicy<V> for NoAbsence {
    #[inline]
    fn is_absence_marker(_value: &V) -> bool {
        false
    }
}

/// `Option<T>` values where a stored `None` is the absence marker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OptionAbsence;

impl<T> AbsencePolicy<Option<T>> for OptionAbsence {
    #[inline]
    fn is_absence_marker(value: &Option<T>) -> bool {
        value.is_none()
    }
}

/// Primitive storage operations.
///
/// Slots identify one stored mapping. A slot handle stays valid while its
/// mapping exists, including across value overwrites, and never aliases a
/// mapping inserted after it was removed.
pub trait RawMap {
    type Key: Eq;
    type Value;
    type Slot: Copy + Eq + core::fmt::Debug;
    /// Live slots in the strategy's iteration order.
    type Slots<'a>: Iterator<Item = Self::Slot>
    where
        Self: 'a;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, key: &Self::Key) -> Option<Self::Slot>;

    fn contains_key(&self, key: &Self::Key) -> bool {
        self.find(key).is_some()
    }

    fn get(&self, key: &Self::Key) -> Option<&Self::Value> {
        let slot = self.find(key)?;
        self.slot(slot).map(|(_, v)| v)
    }

    /// Insert or overwrite. Overwriting keeps the existing slot and returns
    /// the previous value; only a fresh key creates a slot.
    fn insert(&mut self, key: Self::Key, value: Self::Value) -> Option<Self::Value>;

    fn remove(&mut self, key: &Self::Key) -> Option<(Self::Key, Self::Value)> {
        let slot = self.find(key)?;
        self.remove_slot(slot)
    }

    fn clear(&mut self);

    /// Remove every mapping and hand it back in iteration order, leaving
    /// the caller to decide where the keys and values are dropped.
    fn drain(&mut self) -> Vec<(Self::Key, Self::Value)> {
        let slots: Vec<Self::Slot> = self.slots().collect();
        slots
            .into_iter()
            .filter_map(|slot| self.remove_slot(slot))
            .collect()
    }

    fn slots(&self) -> Self::Slots<'_>;

    fn slot(&self, slot: Self::Slot) -> Option<(&Self::Key, &Self::Value)>;

    fn slot_value_mut(&mut self, slot: Self::Slot) -> Option<&mut Self::Value>;

    fn remove_slot(&mut self, slot: Self::Slot) -> Option<(Self::Key, Self::Value)>;

    fn is_absence_marker(_value: &Self::Value) -> bool {
        false
    }
}
