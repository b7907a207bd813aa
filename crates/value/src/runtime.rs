//! The foreign runtime collaborator.
//!
//! [`ForeignRuntime`] is the capability set this crate consumes from whatever
//! dynamic runtime is embedded: object creation, deep copy, reference
//! counting, rich comparison and string conversion, plus the container
//! primitives the typed views delegate to. Every method is called with the
//! bridge's execution lock held, so implementations may assume calls never
//! interleave.
//!
//! Conventions shared by all methods:
//!
//! - Handles passed in are *borrowed*; the callee never consumes a reference.
//! - Constructors and `deep_copy` return *new* references the caller owns.
//! - Accessors (`tuple_get`, `dict_get`, cursors) return *borrowed* handles.
//! - Insertions (`list_insert`, `dict_set`, ...) take a borrowed item and add
//!   their own reference on success; on failure nothing changes.
//! - Faults come back as `Err(ForeignError)`; there is no pending-error slot
//!   to forget about.

use std::fmt;

use crate::error::ForeignResult;
use crate::handle::{ObjectHandle, ObjectKind};

/// Capability set of an embedded dynamic runtime.
pub trait ForeignRuntime: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    // ── identity ────────────────────────────────────────────────────────────

    /// The none singleton. Borrowed; callers that keep it must `incref`.
    fn none(&self) -> ObjectHandle;

    /// Concrete kind of `obj`.
    fn kind(&self, obj: ObjectHandle) -> ObjectKind;

    /// Runtime type name of `obj` (e.g. `"list"`).
    fn type_name(&self, obj: ObjectHandle) -> ForeignResult<String>;

    /// Whether both objects share the same concrete type.
    fn same_type(&self, a: ObjectHandle, b: ObjectHandle) -> bool {
        let (ka, kb) = (self.kind(a), self.kind(b));
        ka == kb
            && (ka != ObjectKind::Custom
                || matches!((self.type_name(a), self.type_name(b)), (Ok(x), Ok(y)) if x == y))
    }

    // ── reference counting ──────────────────────────────────────────────────

    /// Add one reference.
    fn incref(&self, obj: ObjectHandle);

    /// Drop one reference, freeing the object when the count reaches zero.
    fn decref(&self, obj: ObjectHandle);

    /// Live reference count.
    fn refcnt(&self, obj: ObjectHandle) -> i64;

    // ── generic protocols ───────────────────────────────────────────────────

    /// Recursive copy with no aliasing of mutable state. New reference.
    fn deep_copy(&self, obj: ObjectHandle) -> ForeignResult<ObjectHandle>;

    /// Rich `==` comparison.
    fn rich_eq(&self, a: ObjectHandle, b: ObjectHandle) -> ForeignResult<bool>;

    /// Developer-facing representation.
    fn repr(&self, obj: ObjectHandle) -> ForeignResult<String>;

    /// User-facing string conversion.
    fn to_text(&self, obj: ObjectHandle) -> ForeignResult<String>;

    /// Raw bytes of a string (UTF-8), bytes or bytearray object.
    fn bytes_of(&self, obj: ObjectHandle) -> ForeignResult<Vec<u8>>;

    /// Native integer coercion. Out-of-range values fail with an overflow fault.
    fn as_i64(&self, obj: ObjectHandle) -> ForeignResult<i64>;

    /// Native float coercion.
    fn as_f64(&self, obj: ObjectHandle) -> ForeignResult<f64>;

    // ── constructors (new references) ───────────────────────────────────────

    /// Boolean singleton.
    fn new_bool(&self, value: bool) -> ForeignResult<ObjectHandle>;
    /// Integer from a native value.
    fn new_long(&self, value: i64) -> ForeignResult<ObjectHandle>;
    /// Integer by truncating a float.
    fn long_from_f64(&self, value: f64) -> ForeignResult<ObjectHandle>;
    /// Integer parsed from decimal text; may exceed the native range.
    fn long_from_str(&self, text: &str) -> ForeignResult<ObjectHandle>;
    /// Float from a native value.
    fn new_float(&self, value: f64) -> ForeignResult<ObjectHandle>;
    /// Float parsed from text.
    fn float_from_str(&self, text: &str) -> ForeignResult<ObjectHandle>;
    /// Immutable byte string.
    fn new_bytes(&self, data: &[u8]) -> ForeignResult<ObjectHandle>;
    /// Mutable byte buffer.
    fn new_bytearray(&self, data: &[u8]) -> ForeignResult<ObjectHandle>;
    /// Unicode text.
    fn new_string(&self, text: &str) -> ForeignResult<ObjectHandle>;
    /// Tuple of borrowed items; each gains a reference.
    fn new_tuple(&self, items: &[ObjectHandle]) -> ForeignResult<ObjectHandle>;
    /// Empty list.
    fn new_list(&self) -> ForeignResult<ObjectHandle>;
    /// Empty dict.
    fn new_dict(&self) -> ForeignResult<ObjectHandle>;
    /// Empty set.
    fn new_set(&self) -> ForeignResult<ObjectHandle>;
    /// Module with an empty namespace.
    fn new_module(&self, name: &str) -> ForeignResult<ObjectHandle>;

    // ── containers ──────────────────────────────────────────────────────────

    /// Element or entry count of a sized object.
    fn len(&self, obj: ObjectHandle) -> ForeignResult<usize>;

    /// Borrowed tuple element.
    fn tuple_get(&self, obj: ObjectHandle, index: usize) -> ForeignResult<ObjectHandle>;

    /// Borrowed list element.
    fn list_get(&self, obj: ObjectHandle, index: usize) -> ForeignResult<ObjectHandle>;
    /// Replace a list element, releasing the previous one.
    fn list_set(&self, obj: ObjectHandle, index: usize, item: ObjectHandle) -> ForeignResult<()>;
    /// Insert before `index`; indexes past the end append.
    fn list_insert(&self, obj: ObjectHandle, index: usize, item: ObjectHandle) -> ForeignResult<()>;
    /// Append at the end.
    fn list_append(&self, obj: ObjectHandle, item: ObjectHandle) -> ForeignResult<()>;

    /// Borrowed value for `key`, if present.
    fn dict_get(&self, obj: ObjectHandle, key: &str) -> ForeignResult<Option<ObjectHandle>>;
    /// Insert or replace the value for `key`.
    fn dict_set(&self, obj: ObjectHandle, key: &str, item: ObjectHandle) -> ForeignResult<()>;
    /// Advance a dict cursor. Returns borrowed `(key, value)` handles.
    ///
    /// The cursor is only meaningful while the dict is not mutated.
    fn dict_next(&self, obj: ObjectHandle, cursor: &mut usize) -> Option<(ObjectHandle, ObjectHandle)>;
    /// Shallow copy. New reference.
    fn dict_copy(&self, obj: ObjectHandle) -> ForeignResult<ObjectHandle>;

    /// Add an item unless an equal one is present.
    fn set_add(&self, obj: ObjectHandle, item: ObjectHandle) -> ForeignResult<()>;
    /// Advance a set cursor. Returns a borrowed item.
    ///
    /// The cursor is only meaningful while the set is not mutated.
    fn set_next(&self, obj: ObjectHandle, cursor: &mut usize) -> Option<ObjectHandle>;

    /// Resize a bytearray, zero-filling growth.
    fn bytes_resize(&self, obj: ObjectHandle, len: usize) -> ForeignResult<()>;
    /// Overwrite part of a bytearray in place.
    fn bytes_write(&self, obj: ObjectHandle, offset: usize, data: &[u8]) -> ForeignResult<()>;

    /// Module name.
    fn module_name(&self, obj: ObjectHandle) -> ForeignResult<String>;
    /// Borrowed namespace dict of a module.
    fn module_dict(&self, obj: ObjectHandle) -> ForeignResult<ObjectHandle>;
    /// Bind `name` in the module namespace.
    fn module_add_object(&self, obj: ObjectHandle, name: &str, item: ObjectHandle) -> ForeignResult<()>;
}
