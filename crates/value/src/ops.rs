//! The swappable lifecycle table behind every wrapper.
//!
//! [`OpsTable`] is plain data: ten function pointers, each taking the
//! [`ScopedLock`] as proof the runtime is locked. The default table wires
//! them to the bridge's [`ForeignRuntime`](crate::ForeignRuntime); a host
//! integrating a different runtime policy installs its own table through
//! [`BridgeConfig::ops`](crate::BridgeConfig::ops).

use std::fmt;

use crate::bridge::ScopedLock;
use crate::error::ForeignResult;
use crate::handle::{ObjectHandle, ObjectKind};
use crate::runtime::ForeignRuntime;
use crate::tagged::TaggedValue;

/// Initialise from `arg` without touching reference counts.
pub type InitValFn = for<'a> fn(&ScopedLock<'_>, TaggedValue<'a>) -> TaggedValue<'a>;
/// Build a fresh object of a kind. Returns a new reference.
pub type InitObjFn = fn(&ScopedLock<'_>, ObjectKind, TaggedValue<'_>) -> Option<ObjectHandle>;
/// Release what a value owns and reset it to empty.
pub type DeinitFn = fn(&ScopedLock<'_>, &mut TaggedValue<'_>);
/// Produce an owned copy or share.
pub type CopyFn = for<'a> fn(&ScopedLock<'_>, TaggedValue<'a>) -> TaggedValue<'a>;
/// Binary predicate.
pub type CompareFn = fn(&ScopedLock<'_>, TaggedValue<'_>, TaggedValue<'_>) -> bool;
/// Debug rendering.
pub type ReflectFn = fn(&ScopedLock<'_>, TaggedValue<'_>) -> String;
/// Reference count query.
pub type RefcntFn = fn(&ScopedLock<'_>, TaggedValue<'_>) -> i64;

/// Lifecycle operations for tagged values.
///
/// Values must be released under the table that produced them, which is why
/// [`Bridge::set_ops`](crate::Bridge::set_ops) refuses to swap it while any
/// wrapper is alive.
#[derive(Clone, Copy)]
pub struct OpsTable {
    /// Plain initialisation.
    pub init_val: InitValFn,
    /// Kind-directed object construction.
    pub init_obj: InitObjFn,
    /// Release.
    pub deinit: DeinitFn,
    /// Deep copy.
    pub clone: CopyFn,
    /// Reference share.
    pub share: CopyFn,
    /// Identity.
    pub is: CompareFn,
    /// Equality.
    pub eq: CompareFn,
    /// Inequality.
    pub ne: CompareFn,
    /// Debug rendering.
    pub reflect: ReflectFn,
    /// Reference count.
    pub refcnt: RefcntFn,
}

impl Default for OpsTable {
    fn default() -> Self {
        Self {
            init_val: default_init_val,
            init_obj: default_init_obj,
            deinit: default_deinit,
            clone: default_clone,
            share: default_share,
            is: default_is,
            eq: default_eq,
            ne: default_ne,
            reflect: default_reflect,
            refcnt: default_refcnt,
        }
    }
}

impl fmt::Debug for OpsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsTable").finish_non_exhaustive()
    }
}

/// Returns `arg` unchanged.
pub fn default_init_val<'a>(_lock: &ScopedLock<'_>, arg: TaggedValue<'a>) -> TaggedValue<'a> {
    arg
}

/// New object for a native scalar or string. Objects gain a reference.
pub(crate) fn scalar_object(
    runtime: &dyn ForeignRuntime,
    value: TaggedValue<'_>,
) -> Option<ForeignResult<ObjectHandle>> {
    Some(match value {
        TaggedValue::Empty => return None,
        TaggedValue::Cstr(text) => runtime.new_string(text),
        TaggedValue::I64(v) => runtime.new_long(v),
        TaggedValue::I32(v) => runtime.new_long(v.into()),
        TaggedValue::I8(v) => runtime.new_long(v.into()),
        TaggedValue::F64(v) => runtime.new_float(v),
        TaggedValue::F32(v) => runtime.new_float(v.into()),
        TaggedValue::Object(handle) => {
            runtime.incref(handle);
            Ok(handle)
        }
    })
}

fn sequence_items(runtime: &dyn ForeignRuntime, handle: ObjectHandle) -> ForeignResult<Option<Vec<ObjectHandle>>> {
    match runtime.kind(handle) {
        ObjectKind::Tuple => (0..runtime.len(handle)?)
            .map(|i| runtime.tuple_get(handle, i))
            .collect::<ForeignResult<Vec<_>>>()
            .map(Some),
        ObjectKind::List => (0..runtime.len(handle)?)
            .map(|i| runtime.list_get(handle, i))
            .collect::<ForeignResult<Vec<_>>>()
            .map(Some),
        ObjectKind::Set => {
            let mut cursor = 0;
            let mut items = Vec::new();
            while let Some(item) = runtime.set_next(handle, &mut cursor) {
                items.push(item);
            }
            Ok(Some(items))
        }
        _ => Ok(None),
    }
}

fn build_container(
    runtime: &dyn ForeignRuntime,
    kind: ObjectKind,
    items: &[ObjectHandle],
) -> ForeignResult<ObjectHandle> {
    let container = match kind {
        ObjectKind::Tuple => return runtime.new_tuple(items),
        ObjectKind::List => runtime.new_list()?,
        _ => runtime.new_set()?,
    };
    for &item in items {
        let inserted = if kind == ObjectKind::List {
            runtime.list_append(container, item)
        } else {
            runtime.set_add(container, item)
        };
        if let Err(e) = inserted {
            runtime.decref(container);
            return Err(e);
        }
    }
    Ok(container)
}

fn init_container(
    runtime: &dyn ForeignRuntime,
    kind: ObjectKind,
    arg: TaggedValue<'_>,
) -> Option<ForeignResult<ObjectHandle>> {
    if let TaggedValue::Object(handle) = arg {
        match sequence_items(runtime, handle) {
            Ok(Some(items)) => return Some(build_container(runtime, kind, &items)),
            Err(e) => return Some(Err(e)),
            Ok(None) => {}
        }
    }
    let single = match scalar_object(runtime, arg)? {
        Ok(single) => single,
        Err(e) => return Some(Err(e)),
    };
    let built = build_container(runtime, kind, &[single]);
    runtime.decref(single);
    Some(built)
}

pub(crate) fn text_of(runtime: &dyn ForeignRuntime, arg: TaggedValue<'_>) -> Option<ForeignResult<String>> {
    match arg {
        TaggedValue::Empty => None,
        TaggedValue::Cstr(text) => Some(Ok(text.to_owned())),
        TaggedValue::I64(v) => Some(Ok(v.to_string())),
        TaggedValue::I32(v) => Some(Ok(v.to_string())),
        TaggedValue::I8(v) => Some(Ok(v.to_string())),
        TaggedValue::F64(v) => Some(Ok(format!("{v:.6}"))),
        TaggedValue::F32(v) => Some(Ok(format!("{v:.6}"))),
        TaggedValue::Object(handle) => Some(runtime.to_text(handle)),
    }
}

/// Build a fresh object of `kind` from `arg`. Returns a new reference, or
/// `None` when `arg` cannot seed that kind.
pub fn default_init_obj(lock: &ScopedLock<'_>, kind: ObjectKind, arg: TaggedValue<'_>) -> Option<ObjectHandle> {
    let runtime = lock.runtime();
    let built = match (kind, arg) {
        (ObjectKind::NoneType, _) => {
            let none = runtime.none();
            runtime.incref(none);
            Ok(none)
        }
        (ObjectKind::Bool, arg) => {
            let truthy = match arg {
                TaggedValue::Object(handle) => match runtime.kind(handle) {
                    ObjectKind::NoneType => false,
                    ObjectKind::Bool | ObjectKind::Long | ObjectKind::Float => {
                        lock.drained(runtime.as_f64(handle))? != 0.0
                    }
                    sized if sized.is_sized() => lock.drained(runtime.len(handle))? > 0,
                    _ => true,
                },
                TaggedValue::Cstr(text) => !text.is_empty(),
                TaggedValue::Empty => false,
                scalar => f64::try_from(scalar).is_ok_and(|v| v != 0.0),
            };
            runtime.new_bool(truthy)
        }
        (ObjectKind::Bytes | ObjectKind::ByteArray, TaggedValue::Cstr(text)) => {
            if kind == ObjectKind::Bytes {
                runtime.new_bytes(text.as_bytes())
            } else {
                runtime.new_bytearray(text.as_bytes())
            }
        }
        (ObjectKind::Bytes | ObjectKind::ByteArray, TaggedValue::Object(handle)) => {
            if !matches!(
                runtime.kind(handle),
                ObjectKind::String | ObjectKind::Bytes | ObjectKind::ByteArray
            ) {
                return None;
            }
            runtime.bytes_of(handle).and_then(|bytes| {
                if kind == ObjectKind::Bytes {
                    runtime.new_bytes(&bytes)
                } else {
                    runtime.new_bytearray(&bytes)
                }
            })
        }
        (ObjectKind::String, arg) => text_of(runtime, arg)?.and_then(|text| runtime.new_string(&text)),
        (ObjectKind::Tuple | ObjectKind::List | ObjectKind::Set, arg) => init_container(runtime, kind, arg)?,
        (ObjectKind::Long, TaggedValue::Cstr(text)) => runtime.long_from_str(text),
        (ObjectKind::Long, TaggedValue::F64(v)) => runtime.long_from_f64(v),
        (ObjectKind::Long, TaggedValue::F32(v)) => runtime.long_from_f64(v.into()),
        (ObjectKind::Long, TaggedValue::Object(handle)) => match runtime.kind(handle) {
            ObjectKind::Long => {
                runtime.incref(handle);
                Ok(handle)
            }
            ObjectKind::Bool => runtime.as_i64(handle).and_then(|v| runtime.new_long(v)),
            ObjectKind::Float => runtime.as_f64(handle).and_then(|v| runtime.long_from_f64(v)),
            ObjectKind::String => runtime.to_text(handle).and_then(|text| runtime.long_from_str(&text)),
            _ => return None,
        },
        (ObjectKind::Long, scalar) => runtime.new_long(i64::try_from(scalar).ok()?),
        (ObjectKind::Float, TaggedValue::Cstr(text)) => runtime.float_from_str(text),
        (ObjectKind::Float, TaggedValue::Object(handle)) => match runtime.kind(handle) {
            ObjectKind::Long | ObjectKind::Float | ObjectKind::Bool => {
                runtime.as_f64(handle).and_then(|v| runtime.new_float(v))
            }
            ObjectKind::String => runtime.to_text(handle).and_then(|text| runtime.float_from_str(&text)),
            _ => return None,
        },
        (ObjectKind::Float, scalar) => runtime.new_float(f64::try_from(scalar).ok()?),
        (ObjectKind::Dict, TaggedValue::Empty) => runtime.new_dict(),
        (ObjectKind::Dict, TaggedValue::Object(handle)) if runtime.kind(handle) == ObjectKind::Dict => {
            runtime.dict_copy(handle)
        }
        (ObjectKind::Module, TaggedValue::Cstr(name)) => runtime.new_module(name),
        (ObjectKind::Module, TaggedValue::Object(handle)) if runtime.kind(handle) == ObjectKind::String => {
            runtime.to_text(handle).and_then(|name| runtime.new_module(&name))
        }
        (ObjectKind::Custom, TaggedValue::Object(handle)) => {
            runtime.incref(handle);
            Ok(handle)
        }
        _ => return None,
    };
    lock.drained(built)
}

/// Decrement objects and reset every tag to empty.
pub fn default_deinit(lock: &ScopedLock<'_>, value: &mut TaggedValue<'_>) {
    if let TaggedValue::Object(handle) = *value {
        lock.runtime().decref(handle);
    }
    *value = TaggedValue::Empty;
}

/// Deep copy for objects, identity for everything else. A failed copy
/// yields empty.
pub fn default_clone<'a>(lock: &ScopedLock<'_>, value: TaggedValue<'a>) -> TaggedValue<'a> {
    match value {
        TaggedValue::Object(handle) => lock
            .drained(lock.runtime().deep_copy(handle))
            .map_or(TaggedValue::Empty, TaggedValue::Object),
        other => other,
    }
}

/// Increment objects; everything else is copied as is.
pub fn default_share<'a>(lock: &ScopedLock<'_>, value: TaggedValue<'a>) -> TaggedValue<'a> {
    if let TaggedValue::Object(handle) = value {
        lock.runtime().incref(handle);
    }
    value
}

/// Same object. Literals never alias.
pub fn default_is(_lock: &ScopedLock<'_>, l: TaggedValue<'_>, r: TaggedValue<'_>) -> bool {
    matches!((l, r), (TaggedValue::Object(a), TaggedValue::Object(b)) if a == b)
}

fn object_eq_scalar(lock: &ScopedLock<'_>, handle: ObjectHandle, scalar: TaggedValue<'_>) -> bool {
    let runtime = lock.runtime();
    let kind = runtime.kind(handle);
    match scalar {
        TaggedValue::Cstr(text) => {
            matches!(
                kind,
                ObjectKind::String | ObjectKind::Bytes | ObjectKind::ByteArray
            ) && lock
                .drained(runtime.bytes_of(handle))
                .is_some_and(|bytes| bytes == text.as_bytes())
        }
        scalar if scalar.tag().is_integral() => {
            let Ok(rhs) = i64::try_from(scalar) else {
                return false;
            };
            match kind {
                ObjectKind::Long => lock.drained(runtime.as_i64(handle)) == Some(rhs),
                ObjectKind::Float => lock.drained(runtime.as_f64(handle)) == Some(rhs as f64),
                _ => false,
            }
        }
        scalar => {
            let Ok(rhs) = f64::try_from(scalar) else {
                return false;
            };
            matches!(kind, ObjectKind::Long | ObjectKind::Float)
                && lock.drained(runtime.as_f64(handle)) == Some(rhs)
        }
    }
}

/// Cross-tag equality.
///
/// Rules, first match wins:
///
/// 1. anything against empty is unequal
/// 2. two objects use the runtime's rich compare, only when they share a type
/// 3. an object against a string compares its text or bytes
/// 4. an object against a native integer compares as `i64` (integer objects)
///    or `f64` (float objects)
/// 5. an object against a native float compares as `f64` (numeric objects)
/// 6. two strings compare by content
/// 7. a string against a number is unequal
/// 8. two native integers compare as `i64`
/// 9. any other numeric pair compares as `f64`
pub fn default_eq(lock: &ScopedLock<'_>, l: TaggedValue<'_>, r: TaggedValue<'_>) -> bool {
    match (l, r) {
        (TaggedValue::Empty, _) | (_, TaggedValue::Empty) => false,
        (TaggedValue::Object(a), TaggedValue::Object(b)) => {
            let runtime = lock.runtime();
            runtime.same_type(a, b) && lock.drained(runtime.rich_eq(a, b)).unwrap_or(false)
        }
        (TaggedValue::Object(handle), scalar) | (scalar, TaggedValue::Object(handle)) => {
            object_eq_scalar(lock, handle, scalar)
        }
        (TaggedValue::Cstr(a), TaggedValue::Cstr(b)) => a == b,
        (TaggedValue::Cstr(_), _) | (_, TaggedValue::Cstr(_)) => false,
        (a, b) if a.tag().is_integral() && b.tag().is_integral() => {
            matches!((i64::try_from(a), i64::try_from(b)), (Ok(x), Ok(y)) if x == y)
        }
        (a, b) => matches!((f64::try_from(a), f64::try_from(b)), (Ok(x), Ok(y)) if x == y),
    }
}

/// Negation of [`default_eq`].
pub fn default_ne(lock: &ScopedLock<'_>, l: TaggedValue<'_>, r: TaggedValue<'_>) -> bool {
    !default_eq(lock, l, r)
}

/// Render one line describing `value` and log it under `tether::reflect`.
pub fn default_reflect(lock: &ScopedLock<'_>, value: TaggedValue<'_>) -> String {
    let text = match value {
        TaggedValue::Object(handle) => {
            let runtime = lock.runtime();
            let repr = lock
                .drained(runtime.repr(handle))
                .unwrap_or_else(|| "<unrepresentable>".to_owned());
            let type_name = lock
                .drained(runtime.type_name(handle))
                .unwrap_or_else(|| "<unknown>".to_owned());
            format!(
                "repr: {repr}. type [{type_name}], handle [{handle:x}], ref cnt: {}",
                runtime.refcnt(handle)
            )
        }
        TaggedValue::Cstr(text) => format!("type [cstr(const char*)], val [{text}]"),
        TaggedValue::I64(v) => format!("type [i64(long long int)], val [{v}]"),
        TaggedValue::F64(v) => format!("type [f64(double)], val [{v:.6}]"),
        TaggedValue::I32(v) => format!("type [i32(int)], val [{v}]"),
        TaggedValue::F32(v) => format!("type [f32(float)], val [{v:.6}]"),
        TaggedValue::I8(v) => format!("type [i8(char)], val [{v}]"),
        TaggedValue::Empty => "value not initialized yet".to_owned(),
    };
    tracing::debug!(target: "tether::reflect", "{text}");
    text
}

/// Live count for objects; `1` for native scalars.
pub fn default_refcnt(lock: &ScopedLock<'_>, value: TaggedValue<'_>) -> i64 {
    match value {
        TaggedValue::Object(handle) => lock.runtime().refcnt(handle),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::Bridge;
    use crate::error::LastError;
    use crate::heap::HeapRuntime;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn bridge() -> Bridge {
        Bridge::new(Arc::new(HeapRuntime::new()))
    }

    fn repr(lock: &ScopedLock<'_>, value: TaggedValue<'_>) -> String {
        lock.runtime().repr(value.object_handle().unwrap()).unwrap()
    }

    #[rstest]
    #[case::i32_vs_f64(TaggedValue::I32(5), TaggedValue::F64(5.0), true)]
    #[case::i32_vs_cstr(TaggedValue::I32(5), TaggedValue::Cstr("5"), false)]
    #[case::i8_vs_i64(TaggedValue::I8(5), TaggedValue::I64(5), true)]
    #[case::f32_vs_f64(TaggedValue::F32(0.5), TaggedValue::F64(0.5), true)]
    #[case::i64_vs_i64_differ(TaggedValue::I64(5), TaggedValue::I64(6), false)]
    #[case::cstr_content(TaggedValue::Cstr("abc"), TaggedValue::Cstr("abc"), true)]
    #[case::cstr_differs(TaggedValue::Cstr("abc"), TaggedValue::Cstr("abd"), false)]
    #[case::empty_vs_empty(TaggedValue::Empty, TaggedValue::Empty, false)]
    #[case::empty_vs_number(TaggedValue::Empty, TaggedValue::I64(0), false)]
    fn native_equality_matrix(
        #[case] l: TaggedValue<'static>,
        #[case] r: TaggedValue<'static>,
        #[case] expected: bool,
    ) {
        let bridge = bridge();
        let lock = bridge.lock();
        assert_eq!(lock.values_eq(l, r), expected);
        assert_eq!(lock.values_eq(r, l), expected);
        assert_eq!(lock.values_ne(l, r), !expected);
    }

    #[test]
    fn cstr_compares_by_content_not_address() {
        let bridge = bridge();
        let lock = bridge.lock();
        let owned = String::from("abc");
        assert!(lock.values_eq(TaggedValue::Cstr(&owned), TaggedValue::Cstr("abc")));
    }

    #[test]
    fn objects_compare_only_within_a_type() {
        let bridge = bridge();
        let lock = bridge.lock();
        let a = lock.new_long(1);
        let b = lock.new_long(1);
        let f = lock.new_float(1.0);
        assert!(lock.values_eq(a.value(), b.value()));
        assert!(!lock.values_eq(a.value(), f.value()));
        assert!(lock.values_ne(a.value(), f.value()));
    }

    #[test]
    fn object_against_scalars() {
        let bridge = bridge();
        let lock = bridge.lock();
        let long = lock.new_long(5);
        let float = lock.new_float(2.5);
        let text = lock.new_string("hi");
        let blob = lock.new_bytes(b"hi");

        assert!(lock.values_eq(long.value(), TaggedValue::I32(5)));
        assert!(lock.values_eq(TaggedValue::F64(5.0), long.value()));
        assert!(lock.values_eq(float.value(), TaggedValue::F32(2.5)));
        assert!(!lock.values_eq(float.value(), TaggedValue::I64(2)));
        assert!(lock.values_eq(text.value(), TaggedValue::Cstr("hi")));
        assert!(lock.values_eq(blob.value(), TaggedValue::Cstr("hi")));
        assert!(!lock.values_eq(long.value(), TaggedValue::Cstr("5")));
        assert!(!lock.values_eq(text.value(), TaggedValue::I64(0)));
        assert_eq!(lock.take_last_error(), None);
    }

    #[test]
    fn none_object_is_not_equal_to_empty() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert!(!lock.values_eq(lock.none(), TaggedValue::Empty));
        assert!(lock.values_eq(lock.none(), lock.none()));
    }

    #[test]
    fn identity_needs_two_objects() {
        let bridge = bridge();
        let lock = bridge.lock();
        let list = lock.new_list();
        let other = lock.new_list();
        assert!(lock.is_same(list.value(), list.value()));
        assert!(!lock.is_same(list.value(), other.value()));
        assert!(!lock.is_same(TaggedValue::I64(1), TaggedValue::I64(1)));
    }

    #[test]
    fn refcnt_is_one_for_scalars() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert_eq!(lock.refcnt(TaggedValue::F64(1.0)), 1);
        assert_eq!(lock.refcnt(TaggedValue::Empty), 1);
        let list = lock.new_list();
        assert_eq!(lock.refcnt(list.value()), 1);
    }

    #[test]
    fn deinit_resets_every_tag() {
        let bridge = bridge();
        let lock = bridge.lock();
        let mut value = TaggedValue::Cstr("x");
        lock.deinit_value(&mut value);
        assert_eq!(value, TaggedValue::Empty);
    }

    #[test]
    fn failed_clone_yields_empty() {
        let bridge = bridge();
        let lock = bridge.lock();
        let module = lock.new_module("m");
        assert_eq!(lock.clone_value(module.value()), TaggedValue::Empty);
        assert_eq!(lock.take_last_error(), Some(LastError::Foreign));
    }

    #[rstest]
    #[case(TaggedValue::I64(5), "type [i64(long long int)], val [5]")]
    #[case(TaggedValue::F64(1.5), "type [f64(double)], val [1.500000]")]
    #[case(TaggedValue::Cstr("hi"), "type [cstr(const char*)], val [hi]")]
    #[case(TaggedValue::I8(-3), "type [i8(char)], val [-3]")]
    #[case(TaggedValue::Empty, "value not initialized yet")]
    fn reflect_scalars(#[case] value: TaggedValue<'static>, #[case] expected: &str) {
        let bridge = bridge();
        let lock = bridge.lock();
        assert_eq!(lock.reflect(value), expected);
    }

    #[test]
    fn reflect_objects() {
        let bridge = bridge();
        let lock = bridge.lock();
        let list = lock.new_list();
        let text = lock.reflect(list.value());
        assert!(text.starts_with("repr: []. type [list], handle ["), "{text}");
        assert!(text.ends_with("ref cnt: 1"), "{text}");
    }

    #[test]
    fn reflect_of_deep_nesting_reports_the_fault() {
        let bridge = bridge();
        let lock = bridge.lock();
        let mut current = lock.new_list();
        for _ in 0..2_000 {
            let outer = lock.new_list();
            crate::views::ListRef::new(&lock, &outer).append(&current).unwrap();
            current = outer;
        }
        let text = lock.reflect(current.value());
        assert!(text.starts_with("repr: <unrepresentable>. type [list]"), "{text}");
        assert_eq!(lock.take_last_error(), Some(LastError::Foreign));
    }

    #[rstest]
    #[case::bytes_from_cstr(ObjectKind::Bytes, TaggedValue::Cstr("ab"), "b'ab'")]
    #[case::bytearray_from_cstr(ObjectKind::ByteArray, TaggedValue::Cstr("ab"), "bytearray(b'ab')")]
    #[case::string_from_number(ObjectKind::String, TaggedValue::I32(12), "'12'")]
    #[case::tuple_from_scalar(ObjectKind::Tuple, TaggedValue::I64(3), "(3,)")]
    #[case::list_from_scalar(ObjectKind::List, TaggedValue::Cstr("a"), "['a']")]
    #[case::long_from_text(ObjectKind::Long, TaggedValue::Cstr("42"), "42")]
    #[case::long_from_float(ObjectKind::Long, TaggedValue::F64(2.9), "2")]
    #[case::float_from_int(ObjectKind::Float, TaggedValue::I32(2), "2.0")]
    #[case::dict_from_empty(ObjectKind::Dict, TaggedValue::Empty, "{}")]
    #[case::module_from_name(ObjectKind::Module, TaggedValue::Cstr("m"), "<module 'm'>")]
    #[case::bool_from_number(ObjectKind::Bool, TaggedValue::I64(3), "True")]
    fn init_object_by_kind(#[case] kind: ObjectKind, #[case] arg: TaggedValue<'static>, #[case] expected: &str) {
        let bridge = bridge();
        let lock = bridge.lock();
        let built = lock.init_object(kind, arg).unwrap();
        assert_eq!(repr(&lock, built.value()), expected);
    }

    #[test]
    fn init_object_converts_sequences() {
        let bridge = bridge();
        let lock = bridge.lock();
        let tuple = lock.new_tuple(&[TaggedValue::I64(1), TaggedValue::I64(1), TaggedValue::I64(2)]);
        let list = lock.init_object(ObjectKind::List, tuple.value()).unwrap();
        let set = lock.init_object(ObjectKind::Set, tuple.value()).unwrap();
        assert_eq!(repr(&lock, list.value()), "[1, 1, 2]");
        assert_eq!(repr(&lock, set.value()), "{1, 2}");
    }

    #[test]
    fn init_object_refuses_unseedable_kinds() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert!(lock.init_object(ObjectKind::Module, TaggedValue::I64(1)).is_none());
        assert!(lock.init_object(ObjectKind::Custom, TaggedValue::I64(1)).is_none());
        assert!(lock.init_object(ObjectKind::Long, TaggedValue::Cstr("x")).is_none());
        assert_eq!(lock.take_last_error(), Some(LastError::Foreign));
    }
}
