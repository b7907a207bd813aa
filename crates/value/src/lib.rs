//! # Tether Value
//!
//! Host-side values for an embedded dynamic runtime.
//!
//! The host and the runtime exchange [`TaggedValue`]s: a native scalar, a
//! borrowed string, or a handle to a runtime object. Ownership of object
//! handles is never implicit; it lives in one of two wrappers.
//!
//! ## Key Components
//!
//! - **Values**: [`TaggedValue`] and its kind predicates and conversions
//! - **Lifecycle**: [`OpsTable`], the swappable table of init/deinit/copy/compare functions
//! - **Ownership**: [`OwnedValue`] (deep copy on clone) and [`SharedRef`] (refcount share on clone)
//! - **Locking**: [`Bridge::lock`] yields a reentrant [`ScopedLock`], required by every runtime call
//! - **Views**: [`ListRef`], [`DictRef`] and friends refine an object to its kind without owning it
//! - **Runtime**: [`ForeignRuntime`], implemented in-process by [`HeapRuntime`]
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_value::{Bridge, HeapRuntime, ListRef, TaggedValue};
//!
//! let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
//! let lock = bridge.lock();
//!
//! let list = lock.new_list();
//! let view = ListRef::new(&lock, &list);
//! view.append(&TaggedValue::I64(1)).unwrap();
//! view.append(&TaggedValue::Cstr("two")).unwrap();
//! assert_eq!(view.size(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
pub mod error;
pub mod handle;
pub mod heap;
pub mod ops;
pub mod owned;
pub mod runtime;
pub mod shared;
pub mod tagged;
pub mod views;

mod builtins;

pub use bridge::{Bridge, BridgeConfig, ScopedLock};
pub use error::{
    BridgeError, ForeignError, ForeignErrorKind, ForeignResult, LastError, Rejected, ValueError,
};
pub use handle::{ObjectHandle, ObjectKind};
pub use heap::HeapRuntime;
pub use ops::{
    CompareFn, CopyFn, DeinitFn, InitObjFn, InitValFn, OpsTable, ReflectFn, RefcntFn,
    default_clone, default_deinit, default_eq, default_init_obj, default_init_val, default_is,
    default_ne, default_refcnt, default_reflect, default_share,
};
pub use owned::OwnedValue;
pub use runtime::ForeignRuntime;
pub use shared::SharedRef;
pub use tagged::{AsObject, TaggedValue, ValueTag};
pub use views::{
    BytesRef, DictIter, DictRef, ListRef, ModuleRef, SeqIter, SetIter, SetRef, StrRef, TupleRef,
};

/// Common imports for code driving the bridge.
pub mod prelude {
    pub use super::{
        AsObject, Bridge, DictRef, ListRef, ModuleRef, OwnedValue, ScopedLock, SharedRef,
        TaggedValue, TupleRef, ValueError,
    };
}
