//! The deep-copy wrapper.

use std::fmt;
use std::mem;

use crate::bridge::{Bridge, ScopedLock};
use crate::shared::SharedRef;
use crate::tagged::{AsObject, TaggedValue};

/// Owns one [`TaggedValue`] under the deep-copy discipline.
///
/// `Clone` runs the ops table's `clone`, so two `OwnedValue`s never observe
/// each other's mutations. `Drop` runs `deinit` exactly once. Both take the
/// bridge lock themselves; code already holding it uses [`clone_in`] and
/// [`release_in`].
///
/// [`clone_in`]: OwnedValue::clone_in
/// [`release_in`]: OwnedValue::release_in
pub struct OwnedValue<'a> {
    bridge: Bridge,
    value: TaggedValue<'a>,
}

impl<'a> OwnedValue<'a> {
    /// An empty value bound to `bridge`.
    pub fn empty(bridge: &Bridge) -> Self {
        Self {
            bridge: bridge.clone(),
            value: TaggedValue::Empty,
        }
    }

    /// Own an independent copy of `value`.
    pub fn copy_of(lock: &ScopedLock<'_>, value: TaggedValue<'a>) -> Self {
        Self {
            bridge: lock.bridge().clone(),
            value: lock.clone_value(value),
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

    /// The bridge this value releases through.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Move the value out, leaving this one empty.
    pub fn take(&mut self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            value: mem::take(&mut self.value),
        }
    }

    /// [`Clone`] for callers already holding the lock.
    pub fn clone_in(&self, lock: &ScopedLock<'_>) -> Self {
        debug_assert!(lock.bridge().ptr_eq(&self.bridge), "lock of another bridge");
        Self::copy_of(lock, self.value)
    }

    /// Release under an already-held lock instead of locking in `Drop`.
    pub fn release_in(mut self, lock: &ScopedLock<'_>) {
        debug_assert!(lock.bridge().ptr_eq(&self.bridge), "lock of another bridge");
        lock.deinit_value(&mut self.value);
    }

    /// Hand the reference over to the shared discipline without copying.
    pub fn into_shared(mut self) -> SharedRef<'a> {
        let value = mem::take(&mut self.value);
        SharedRef::from_new_reference(&self.bridge, value)
    }
}

impl Clone for OwnedValue<'_> {
    fn clone(&self) -> Self {
        let lock = self.bridge.lock();
        self.clone_in(&lock)
    }
}

impl Drop for OwnedValue<'_> {
    fn drop(&mut self) {
        // Scalars own nothing; skip the lock for them.
        if self.value.is_object() {
            let lock = self.bridge.lock();
            lock.deinit_value(&mut self.value);
        }
    }
}

impl PartialEq for OwnedValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        let lock = self.bridge.lock();
        lock.values_eq(self.value, other.value)
    }
}

impl AsObject for OwnedValue<'_> {
    fn as_tagged(&self) -> TaggedValue<'_> {
        self.value
    }
}

impl fmt::Debug for OwnedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedValue").field(&self.value).finish()
    }
}
