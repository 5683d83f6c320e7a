//! live-map: a mutable map contract whose compound operations are derived
//! from a handful of primitives, with live, fail-fast views.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: define `putIfAbsent`/`compute`/`merge`-style operations once,
//!   in terms of `get`/`put`/`remove`/`contains_key`, so every storage
//!   strategy gets the same observable behavior for free.
//! - Layers:
//!   - RawMap: primitive storage contract. Strategies own layout, hashing
//!     and order, and hand out generational slot handles.
//!     - HandleHashMap<K, V, S>: hashed buckets in a `SlotMap`, indexed by
//!       a `HashTable` of slot keys; hashes are cached per bucket.
//!     - LinearMap<K, V, P>: insertion-ordered, `Eq`-only keys, optional
//!       absence-marker values through the `P: AbsencePolicy<V>` parameter.
//!   - Map: the public trait. Required methods are the primitives; every
//!     derived operation is a provided method built only from them.
//!   - LiveMap<M>: implements `Map` over any `RawMap`, counts structural
//!     modifications and serves the live views (`keys`, `values`,
//!     `entries`) and their `Entry` handles.
//!
//! Constraints
//! - Single-threaded: `LiveMap` keeps storage in a `RefCell` and is
//!   `!Sync`. Nothing here is atomic; a strategy that wants atomic compound
//!   operations must implement `Map` itself and override them.
//! - No storage borrow is held while caller closures run, or while removed
//!   keys and values are dropped, so that code may use the map again.
//! - Derived operations return `MapError::Unsupported` on a read-only map
//!   before any primitive call, and never write on behalf of a closure that
//!   returned an error or panicked.
//!
//! Absence
//! - `get` returns `Option<V>`: `None` is "no mapping", `Some(v)` is a
//!   stored value. A strategy may declare some stored values to be the
//!   absence marker (e.g. `None` in an `Option<T>` value); presence checks
//!   in the derived operations treat such a key as missing.
//!
//! Fail-fast views
//! - Views borrow the map; they never copy it. Iterators compare the
//!   structural modification count on every step and report
//!   `ModificationConflict` after out-of-band changes. Their own
//!   `remove_current` keeps them valid. Detection is best effort.
//!
//! Notes and non-goals
//! - Iteration order is whatever the storage strategy defines.
//! - Keys and values handed out by `LiveMap` are clones.
//! - No persistence, serialization or thread-safety guarantees.

pub mod error;
pub mod handle_hash_map;
mod handle_hash_map_proptest;
pub mod linear_map;
pub mod live_map;
pub mod map;
pub mod raw;
mod reentrancy;
pub mod view;

// Public surface
pub use error::MapError;
pub use handle_hash_map::{Handle, HandleHashMap};
pub use linear_map::{LinearMap, LinearSlot};
pub use live_map::{LiveHashMap, LiveLinearMap, LiveMap};
pub use map::{
    comparing_by_key, comparing_by_key_with, comparing_by_value, comparing_by_value_with,
    entry_hash_code, Map, MapEntry,
};
pub use raw::{AbsencePolicy, NoAbsence, OptionAbsence, RawMap};
pub use view::{Entry, EntryIter, EntrySet, KeySet, KeysIter, Values, ValuesIter};
