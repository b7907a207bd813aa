//! Kind-refined views over foreign objects.
//!
//! A view pairs the held [`ScopedLock`] with one object handle. It adds no
//! reference of its own; it borrows the wrapper (or bare value) it was built
//! from for its whole lifetime, so the object cannot be released under it.
//!
//! [`new`](ListRef::new) checks the kind with a `debug_assert!` only, and
//! accepts the runtime's none object, whose `size()` is `-1`.
//! [`try_new`](ListRef::try_new) is the checked refinement.

use crate::bridge::ScopedLock;
use crate::error::{Rejected, ValueError};
use crate::handle::{ObjectHandle, ObjectKind};
use crate::ops::scalar_object;
use crate::shared::SharedRef;
use crate::tagged::TaggedValue;

macro_rules! typed_view {
    ($(#[$meta:meta])* $name:ident => $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'s> {
            lock: &'s $crate::bridge::ScopedLock<'s>,
            handle: $crate::handle::ObjectHandle,
        }

        impl<'s> $name<'s> {
            const KINDS: &'static [$crate::handle::ObjectKind] =
                &[$($crate::handle::ObjectKind::$kind),+];

            /// Refine `source` without a release-mode kind check.
            pub fn new(
                lock: &'s $crate::bridge::ScopedLock<'s>,
                source: &'s impl $crate::tagged::AsObject,
            ) -> Self {
                let handle = $crate::views::handle_of(lock, source.as_tagged());
                debug_assert!(
                    $crate::views::accepts(lock, handle, Self::KINDS),
                    concat!(stringify!($name), " over an object of another kind"),
                );
                Self { lock, handle }
            }

            /// Refine `source` only if it has the right kind.
            pub fn try_new(
                lock: &'s $crate::bridge::ScopedLock<'s>,
                source: &'s impl $crate::tagged::AsObject,
            ) -> Option<Self> {
                let handle = source.as_tagged().object_handle()?;
                Self::KINDS
                    .contains(&lock.runtime().kind(handle))
                    .then_some(Self { lock, handle })
            }

            #[allow(dead_code, reason = "not every view is produced from a bare handle")]
            pub(crate) fn from_handle(
                lock: &'s $crate::bridge::ScopedLock<'s>,
                handle: $crate::handle::ObjectHandle,
            ) -> Self {
                Self { lock, handle }
            }

            /// The viewed object.
            pub fn handle(&self) -> $crate::handle::ObjectHandle {
                self.handle
            }

            /// The viewed object as a borrowed value.
            pub fn value(&self) -> $crate::tagged::TaggedValue<'static> {
                $crate::tagged::TaggedValue::Object(self.handle)
            }

            /// Whether this views the runtime's none object.
            pub fn is_none(&self) -> bool {
                self.handle == self.lock.runtime().none()
            }

            /// A new share of the viewed object.
            pub fn share(&self) -> $crate::shared::SharedRef<'static> {
                $crate::shared::SharedRef::share(self.lock, self.value())
            }
        }

        impl $crate::tagged::AsObject for $name<'_> {
            fn as_tagged(&self) -> $crate::tagged::TaggedValue<'_> {
                $crate::tagged::TaggedValue::Object(self.handle)
            }
        }

        impl ::std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.handle).finish()
            }
        }
    };
}

mod map;
mod module;
mod seq;
mod text;

pub use map::{DictIter, DictRef, SetIter, SetRef};
pub use module::ModuleRef;
pub use seq::{ListRef, SeqIter, TupleRef};
pub use text::{BytesRef, StrRef};

/// Handle behind `value`; empty maps to none.
pub(crate) fn handle_of(lock: &ScopedLock<'_>, value: TaggedValue<'_>) -> ObjectHandle {
    value
        .object_handle()
        .unwrap_or_else(|| lock.runtime().none())
}

pub(crate) fn accepts(lock: &ScopedLock<'_>, handle: ObjectHandle, kinds: &[ObjectKind]) -> bool {
    let kind = lock.runtime().kind(handle);
    kind == ObjectKind::NoneType || kinds.contains(&kind)
}

/// Length, or `-1` for the none object and on runtime faults.
pub(crate) fn size_of(lock: &ScopedLock<'_>, handle: ObjectHandle) -> i64 {
    if handle == lock.runtime().none() {
        return -1;
    }
    lock.drained(lock.runtime().len(handle))
        .map_or(-1, |len| len as i64)
}

/// Run `insert` with an object for `value`, converting native scalars to a
/// temporary object first.
pub(crate) fn with_object(
    lock: &ScopedLock<'_>,
    value: TaggedValue<'_>,
    insert: impl FnOnce(ObjectHandle) -> Result<(), ValueError>,
) -> Result<(), ValueError> {
    if let TaggedValue::Object(handle) = value {
        return insert(handle);
    }
    let runtime = lock.runtime();
    let temp = scalar_object(runtime, value)
        .ok_or(ValueError::NotAnObject(value.tag().name()))?
        .map_err(|e| lock.fault(e))?;
    let inserted = insert(temp);
    runtime.decref(temp);
    inserted
}

/// Steal-flavoured insertion: on success the container keeps its own
/// reference and `item`'s share is released; on failure `item` comes back
/// untouched.
pub(crate) fn steal<'a>(
    lock: &ScopedLock<'_>,
    item: SharedRef<'a>,
    insert: impl FnOnce(ObjectHandle) -> Result<(), ValueError>,
) -> Result<(), Rejected<SharedRef<'a>>> {
    match with_object(lock, item.value(), insert) {
        Ok(()) => {
            item.release_in(lock);
            Ok(())
        }
        Err(error) => Err(Rejected { error, item }),
    }
}

/// Checked `usize` index into a sequence of `len` items.
pub(crate) fn check_index(index: usize, len: i64) -> Result<usize, ValueError> {
    if (index as i64) < len {
        Ok(index)
    } else {
        Err(ValueError::IndexOutOfRange {
            index: index as i64,
            len,
        })
    }
}
