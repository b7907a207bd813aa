//! The reference-sharing wrapper.

use std::fmt;
use std::mem;

use crate::bridge::{Bridge, ScopedLock};
use crate::owned::OwnedValue;
use crate::tagged::{AsObject, TaggedValue};

/// Owns one reference-count share of a [`TaggedValue`].
///
/// `Clone` runs the ops table's `share`: every copy aliases the same foreign
/// object and observes its mutations. `Drop` runs `deinit`, releasing one
/// share; the runtime frees the object when the last one goes.
///
/// There is deliberately no constructor taking a bare handle: a value enters
/// either through [`SharedRef::share`] or from a builtin constructor that
/// produced a fresh reference.
pub struct SharedRef<'a> {
    bridge: Bridge,
    value: TaggedValue<'a>,
}

impl<'a> SharedRef<'a> {
    /// An empty reference bound to `bridge`.
    pub fn empty(bridge: &Bridge) -> Self {
        Self {
            bridge: bridge.clone(),
            value: TaggedValue::Empty,
        }
    }

    /// Take an additional share of `value`.
    pub fn share(lock: &ScopedLock<'_>, value: TaggedValue<'a>) -> Self {
        Self {
            bridge: lock.bridge().clone(),
            value: lock.share_value(value),
        }
    }

    /// Adopt a reference the caller already owns.
    pub(crate) fn from_new_reference(bridge: &Bridge, value: TaggedValue<'a>) -> Self {
        Self {
            bridge: bridge.clone(),
            value,
        }
    }

    /// The borrowed value.
    pub fn value(&self) -> TaggedValue<'a> {
        self.value
    }

    /// The bridge this reference releases through.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Move the reference out, leaving this one empty.
    pub fn take(&mut self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            value: mem::take(&mut self.value),
        }
    }

    /// [`Clone`] for callers already holding the lock.
    pub fn clone_in(&self, lock: &ScopedLock<'_>) -> Self {
        debug_assert!(lock.bridge().ptr_eq(&self.bridge), "lock of another bridge");
        Self::share(lock, self.value)
    }

    /// Release under an already-held lock instead of locking in `Drop`.
    pub fn release_in(mut self, lock: &ScopedLock<'_>) {
        debug_assert!(lock.bridge().ptr_eq(&self.bridge), "lock of another bridge");
        lock.deinit_value(&mut self.value);
    }

    /// Convert to the deep-copy discipline.
    ///
    /// The reference is handed over as is when this is its only share, and
    /// deep-copied otherwise, so the result never aliases another holder.
    pub fn into_owned(self) -> OwnedValue<'a> {
        let bridge = self.bridge.clone();
        let lock = bridge.lock();
        self.into_owned_in(&lock)
    }

    /// [`into_owned`](Self::into_owned) for callers already holding the lock.
    pub fn into_owned_in(mut self, lock: &ScopedLock<'_>) -> OwnedValue<'a> {
        if lock.refcnt(self.value) <= 1 {
            let value = mem::take(&mut self.value);
            OwnedValue::from_new_reference(&self.bridge, value)
        } else {
            let copy = OwnedValue::copy_of(lock, self.value);
            self.release_in(lock);
            copy
        }
    }
}

impl Clone for SharedRef<'_> {
    fn clone(&self) -> Self {
        let lock = self.bridge.lock();
        self.clone_in(&lock)
    }
}

impl Drop for SharedRef<'_> {
    fn drop(&mut self) {
        if self.value.is_object() {
            let lock = self.bridge.lock();
            lock.deinit_value(&mut self.value);
        }
    }
}

impl PartialEq for SharedRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        let lock = self.bridge.lock();
        lock.values_eq(self.value, other.value)
    }
}

impl AsObject for SharedRef<'_> {
    fn as_tagged(&self) -> TaggedValue<'_> {
        self.value
    }
}

impl fmt::Debug for SharedRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedRef").field(&self.value).finish()
    }
}
