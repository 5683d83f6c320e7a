//! Debug-only reentrancy check for storage strategies.
//!
//! Storage probes call into user `Eq`/`Hash` while their own state is
//! borrowed. A probe that re-enters the same storage from inside one of
//! those calls is a bug in the caller's key type; debug builds turn it into
//! a panic naming both operations. Release builds compile the check away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-storage tracker. Guard each entry point with
/// `let _g = self.reentrancy.enter("op");`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Storage is single-threaded; keep the tracker !Send + !Sync with it.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Enter a guarded section. In debug builds, panics if another section of
    /// the same tracker is still open.
    #[inline]
    pub(crate) fn enter(&self, operation: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrancy detected: `{operation}` entered storage during `{outer}`");
            }
            self.active.set(Some(operation));
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = operation;
            return ReentrancyGuard { _z: PhantomData };
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

// A cloned storage starts with no open section.
impl Clone for DebugReentrancy {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
