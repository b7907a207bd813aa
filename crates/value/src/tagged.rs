//! The tagged value handle shared by every layer.

use std::ffi::c_void;
use std::fmt;

use crate::bridge::ScopedLock;
use crate::error::{ForeignErrorKind, ValueError};
use crate::handle::{ObjectHandle, ObjectKind};

/// Discriminant of a [`TaggedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    /// Nothing initialised yet.
    Empty,
    /// Borrowed string.
    Cstr,
    /// Native `i64`.
    I64,
    /// Native `f64`.
    F64,
    /// Native `i32`.
    I32,
    /// Native `f32`.
    F32,
    /// Native `i8`, the only source of `char` conversions.
    I8,
    /// Foreign object handle.
    Object,
}

impl ValueTag {
    /// Name used in errors and reflection.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Cstr => "cstr",
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::I8 => "i8",
            Self::Object => "object",
        }
    }

    /// Native integral tags.
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::I64 | Self::I32 | Self::I8)
    }

    /// Native floating tags.
    pub const fn is_floating(self) -> bool {
        matches!(self, Self::F64 | Self::F32)
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A native scalar, a borrowed string, or a foreign object handle.
///
/// A bare `TaggedValue` carries no ownership and is freely copyable. Wrap it
/// in [`OwnedValue`](crate::OwnedValue) or [`SharedRef`](crate::SharedRef) to
/// own what an `Object` points at.
///
/// Derived `PartialEq` is structural (same tag, same payload). The cross-tag
/// equality of the ops table is [`ScopedLock::values_eq`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TaggedValue<'a> {
    /// Nothing initialised yet.
    #[default]
    Empty,
    /// Borrowed string.
    Cstr(&'a str),
    /// Native `i64`.
    I64(i64),
    /// Native `f64`.
    F64(f64),
    /// Native `i32`.
    I32(i32),
    /// Native `f32`.
    F32(f32),
    /// Native `i8`.
    I8(i8),
    /// Foreign object. Never null; "no object" is the runtime's none.
    Object(ObjectHandle),
}

impl<'a> TaggedValue<'a> {
    /// Object value from an optional handle; `None` becomes the runtime's none.
    pub fn object(lock: &ScopedLock<'_>, handle: Option<ObjectHandle>) -> Self {
        Self::Object(handle.unwrap_or_else(|| lock.runtime().none()))
    }

    /// Object value from a raw pointer; null becomes the runtime's none.
    pub fn from_ptr(lock: &ScopedLock<'_>, ptr: *mut c_void) -> Self {
        Self::object(lock, ObjectHandle::from_ptr(ptr))
    }

    /// The active tag.
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::Empty => ValueTag::Empty,
            Self::Cstr(_) => ValueTag::Cstr,
            Self::I64(_) => ValueTag::I64,
            Self::F64(_) => ValueTag::F64,
            Self::I32(_) => ValueTag::I32,
            Self::F32(_) => ValueTag::F32,
            Self::I8(_) => ValueTag::I8,
            Self::Object(_) => ValueTag::Object,
        }
    }

    // ── exclusive tag predicates ────────────────────────────────────────────

    /// Empty tag.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
    /// Borrowed-string tag.
    pub const fn is_cstr(&self) -> bool {
        matches!(self, Self::Cstr(_))
    }
    /// `i64` tag.
    pub const fn is_i64(&self) -> bool {
        matches!(self, Self::I64(_))
    }
    /// `f64` tag.
    pub const fn is_f64(&self) -> bool {
        matches!(self, Self::F64(_))
    }
    /// `i32` tag.
    pub const fn is_i32(&self) -> bool {
        matches!(self, Self::I32(_))
    }
    /// `f32` tag.
    pub const fn is_f32(&self) -> bool {
        matches!(self, Self::F32(_))
    }
    /// `i8` tag.
    pub const fn is_i8(&self) -> bool {
        matches!(self, Self::I8(_))
    }
    /// Object tag.
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// The object handle, for object tags.
    pub const fn object_handle(&self) -> Option<ObjectHandle> {
        match self {
            Self::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    /// The borrowed string, for the cstr tag.
    pub const fn as_cstr(&self) -> Option<&'a str> {
        match self {
            Self::Cstr(text) => Some(*text),
            _ => None,
        }
    }

    // ── kind predicates ─────────────────────────────────────────────────────

    /// Foreign kind of an object value.
    pub fn object_kind(&self, lock: &ScopedLock<'_>) -> Option<ObjectKind> {
        self.object_handle().map(|handle| lock.runtime().kind(handle))
    }

    fn has_kind(&self, lock: &ScopedLock<'_>, kind: ObjectKind) -> bool {
        self.object_kind(lock) == Some(kind)
    }

    /// Empty, or the runtime's none object.
    pub fn is_none(&self, lock: &ScopedLock<'_>) -> bool {
        match self {
            Self::Empty => true,
            Self::Object(handle) => *handle == lock.runtime().none(),
            _ => false,
        }
    }

    /// Native integral tag or an integer object. Booleans are not integral.
    pub fn is_integral(&self, lock: &ScopedLock<'_>) -> bool {
        self.tag().is_integral() || self.has_kind(lock, ObjectKind::Long)
    }

    /// Native floating tag or a float object.
    pub fn is_floating(&self, lock: &ScopedLock<'_>) -> bool {
        self.tag().is_floating() || self.has_kind(lock, ObjectKind::Float)
    }

    /// Integral or floating.
    pub fn is_numeric(&self, lock: &ScopedLock<'_>) -> bool {
        self.is_integral(lock) || self.is_floating(lock)
    }

    /// Boolean object.
    pub fn is_bool_object(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::Bool)
    }

    /// Bytes object.
    pub fn is_bytes(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::Bytes)
    }

    /// Bytearray object.
    pub fn is_bytearray(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::ByteArray)
    }

    /// Bytes or bytearray object.
    pub fn is_bytes_or_bytearray(&self, lock: &ScopedLock<'_>) -> bool {
        self.is_bytes(lock) || self.is_bytearray(lock)
    }

    /// String object.
    pub fn is_string(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::String)
    }

    /// Tuple object.
    pub fn is_tuple(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::Tuple)
    }

    /// List object.
    pub fn is_list(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::List)
    }

    /// Set object.
    pub fn is_set(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::Set)
    }

    /// Dict object.
    pub fn is_dict(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::Dict)
    }

    /// Module object.
    pub fn is_module(&self, lock: &ScopedLock<'_>) -> bool {
        self.has_kind(lock, ObjectKind::Module)
    }

    // ── conversions ─────────────────────────────────────────────────────────

    fn mismatch(&self, to: &'static str) -> ValueError {
        ValueError::Conversion {
            from: self.tag().name(),
            to,
        }
    }

    fn object_i64(lock: &ScopedLock<'_>, handle: ObjectHandle, to: &'static str) -> Result<i64, ValueError> {
        lock.runtime().as_i64(handle).map_err(|e| {
            if e.kind == ForeignErrorKind::Overflow {
                ValueError::Overflow {
                    value: lock
                        .runtime()
                        .repr(handle)
                        .unwrap_or_else(|_| "<integer>".to_owned()),
                    to,
                }
            } else {
                ValueError::Foreign(e)
            }
        })
    }

    /// Checked conversion to `i64`.
    pub fn try_to_i64(&self, lock: &ScopedLock<'_>) -> Result<i64, ValueError> {
        match *self {
            Self::Object(handle) => Self::object_i64(lock, handle, "i64"),
            _ => i64::try_from(*self),
        }
    }

    /// Checked conversion to `f64`.
    pub fn try_to_f64(&self, lock: &ScopedLock<'_>) -> Result<f64, ValueError> {
        match *self {
            Self::Object(handle) => Ok(lock.runtime().as_f64(handle)?),
            _ => f64::try_from(*self),
        }
    }

    /// Checked conversion to `i32`. Out-of-range values are an overflow, not
    /// a truncation.
    pub fn try_to_i32(&self, lock: &ScopedLock<'_>) -> Result<i32, ValueError> {
        match *self {
            Self::Object(handle) => {
                let wide = Self::object_i64(lock, handle, "i32")?;
                i32::try_from(wide).map_err(|_| ValueError::Overflow {
                    value: wide.to_string(),
                    to: "i32",
                })
            }
            _ => i32::try_from(*self),
        }
    }

    /// Checked conversion to `f32`. Finite values beyond `f32::MAX` overflow.
    pub fn try_to_f32(&self, lock: &ScopedLock<'_>) -> Result<f32, ValueError> {
        match *self {
            Self::Object(handle) => narrow_f64(lock.runtime().as_f64(handle)?),
            _ => f32::try_from(*self),
        }
    }

    /// Checked conversion to a C `char`. Only the `i8` tag converts.
    pub fn try_to_char(&self) -> Result<i8, ValueError> {
        match *self {
            Self::I8(value) => Ok(value),
            _ => Err(self.mismatch("char")),
        }
    }

    fn sentinel<T: From<i8>>(lock: &ScopedLock<'_>, result: Result<T, ValueError>) -> T {
        result.unwrap_or_else(|error| {
            match error {
                ValueError::Foreign(fault) => lock.drain(fault),
                other => {
                    tracing::debug!(error = %other, "conversion fell back to sentinel");
                    lock.record(other.code());
                }
            }
            T::from(-1)
        })
    }

    /// `i64` or `-1`, recording the reason in the bridge's last error.
    pub fn to_i64(&self, lock: &ScopedLock<'_>) -> i64 {
        Self::sentinel(lock, self.try_to_i64(lock))
    }

    /// `f64` or `-1.0`, recording the reason in the bridge's last error.
    pub fn to_f64(&self, lock: &ScopedLock<'_>) -> f64 {
        Self::sentinel(lock, self.try_to_f64(lock))
    }

    /// `i32` or `-1`, recording the reason in the bridge's last error.
    pub fn to_i32(&self, lock: &ScopedLock<'_>) -> i32 {
        Self::sentinel(lock, self.try_to_i32(lock))
    }

    /// `f32` or `-1.0`, recording the reason in the bridge's last error.
    pub fn to_f32(&self, lock: &ScopedLock<'_>) -> f32 {
        Self::sentinel(lock, self.try_to_f32(lock))
    }

    /// `char` or `-1`, recording the reason in the bridge's last error.
    pub fn to_char(&self, lock: &ScopedLock<'_>) -> i8 {
        Self::sentinel(lock, self.try_to_char())
    }
}

fn narrow_f64(value: f64) -> Result<f32, ValueError> {
    if value.is_finite() && value.abs() > f64::from(f32::MAX) {
        return Err(ValueError::Overflow {
            value: value.to_string(),
            to: "f32",
        });
    }
    Ok(value as f32)
}

macro_rules! tagged_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for TaggedValue<'_> {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }
    )*};
}

tagged_from! {
    i64 => I64,
    f64 => F64,
    i32 => I32,
    f32 => F32,
    i8 => I8,
    ObjectHandle => Object,
}

impl<'a> From<&'a str> for TaggedValue<'a> {
    fn from(value: &'a str) -> Self {
        Self::Cstr(value)
    }
}

// Lock-free conversions cover native scalars only; objects need a lock.

impl TryFrom<TaggedValue<'_>> for i64 {
    type Error = ValueError;

    fn try_from(value: TaggedValue<'_>) -> Result<Self, Self::Error> {
        match value {
            TaggedValue::I64(v) => Ok(v),
            TaggedValue::I32(v) => Ok(v.into()),
            TaggedValue::I8(v) => Ok(v.into()),
            other => Err(other.mismatch("i64")),
        }
    }
}

impl TryFrom<TaggedValue<'_>> for f64 {
    type Error = ValueError;

    fn try_from(value: TaggedValue<'_>) -> Result<Self, Self::Error> {
        match value {
            TaggedValue::F64(v) => Ok(v),
            TaggedValue::F32(v) => Ok(v.into()),
            TaggedValue::I64(v) => Ok(v as Self),
            TaggedValue::I32(v) => Ok(v.into()),
            TaggedValue::I8(v) => Ok(v.into()),
            other => Err(other.mismatch("f64")),
        }
    }
}

impl TryFrom<TaggedValue<'_>> for i32 {
    type Error = ValueError;

    fn try_from(value: TaggedValue<'_>) -> Result<Self, Self::Error> {
        match value {
            TaggedValue::I32(v) => Ok(v),
            TaggedValue::I8(v) => Ok(v.into()),
            TaggedValue::I64(v) => Self::try_from(v).map_err(|_| ValueError::Overflow {
                value: v.to_string(),
                to: "i32",
            }),
            other => Err(other.mismatch("i32")),
        }
    }
}

impl TryFrom<TaggedValue<'_>> for f32 {
    type Error = ValueError;

    fn try_from(value: TaggedValue<'_>) -> Result<Self, Self::Error> {
        match value {
            TaggedValue::F32(v) => Ok(v),
            TaggedValue::F64(v) => narrow_f64(v),
            TaggedValue::I64(v) => Ok(v as Self),
            TaggedValue::I32(v) => Ok(v as Self),
            TaggedValue::I8(v) => Ok(v.into()),
            other => Err(other.mismatch("f32")),
        }
    }
}

/// Anything that can lend a [`TaggedValue`]: bare values, wrappers and views.
///
/// Views and copy-flavoured insertions accept `&impl AsObject`, so callers
/// never have to unwrap a wrapper to pass it along.
pub trait AsObject {
    /// The borrowed value.
    fn as_tagged(&self) -> TaggedValue<'_>;
}

impl AsObject for TaggedValue<'_> {
    fn as_tagged(&self) -> TaggedValue<'_> {
        *self
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

    fn exclusive_predicates(value: &TaggedValue<'_>) -> [bool; 8] {
        [
            value.is_empty(),
            value.is_cstr(),
            value.is_i64(),
            value.is_f64(),
            value.is_i32(),
            value.is_f32(),
            value.is_i8(),
            value.is_object(),
        ]
    }

    #[rstest]
    #[case(TaggedValue::Empty)]
    #[case(TaggedValue::from("text"))]
    #[case(TaggedValue::from(1_i64))]
    #[case(TaggedValue::from(1.5_f64))]
    #[case(TaggedValue::from(7_i32))]
    #[case(TaggedValue::from(2.5_f32))]
    #[case(TaggedValue::from(b'a' as i8))]
    #[case(TaggedValue::Object(ObjectHandle::from_addr(16).unwrap()))]
    fn exactly_one_tag_predicate_holds(#[case] value: TaggedValue<'static>) {
        let hits = exclusive_predicates(&value).iter().filter(|&&hit| hit).count();
        assert_eq!(hits, 1, "{value:?}");
    }

    #[test]
    fn null_pointer_becomes_none() {
        let bridge = bridge();
        let lock = bridge.lock();
        let value = TaggedValue::from_ptr(&lock, std::ptr::null_mut());
        assert!(value.is_object());
        assert!(value.is_none(&lock));
        assert_eq!(value.object_handle(), Some(lock.runtime().none()));
        assert!(!value.object_handle().unwrap().as_ptr().is_null());
    }

    #[test]
    fn empty_counts_as_none() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert!(TaggedValue::Empty.is_none(&lock));
        assert!(!TaggedValue::I64(0).is_none(&lock));
    }

    #[test]
    fn kind_predicates_follow_the_object() {
        let bridge = bridge();
        let lock = bridge.lock();
        let long = lock.new_long(3);
        let flag = lock.new_bool(true);
        assert!(long.value().is_integral(&lock));
        assert!(long.value().is_numeric(&lock));
        assert!(!flag.value().is_integral(&lock));
        assert!(flag.value().is_bool_object(&lock));
        assert!(TaggedValue::F32(1.0).is_floating(&lock));
        assert_eq!(long.value().object_kind(&lock), Some(ObjectKind::Long));
        assert_eq!(TaggedValue::I8(1).object_kind(&lock), None);
    }

    #[rstest]
    #[case(TaggedValue::I32(-4), -4)]
    #[case(TaggedValue::I8(9), 9)]
    #[case(TaggedValue::I64(i64::MAX), i64::MAX)]
    fn native_integrals_widen(#[case] value: TaggedValue<'static>, #[case] expected: i64) {
        assert_eq!(i64::try_from(value).unwrap(), expected);
    }

    #[test]
    fn narrowing_reports_overflow() {
        let err = i32::try_from(TaggedValue::I64(1 << 40)).unwrap_err();
        assert_eq!(err.code(), LastError::Overflow);
        let err = f32::try_from(TaggedValue::F64(1e300)).unwrap_err();
        assert_eq!(err.code(), LastError::Overflow);
        assert!(f32::try_from(TaggedValue::F64(f64::INFINITY)).unwrap().is_infinite());
    }

    #[test]
    fn char_only_from_i8() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert_eq!(TaggedValue::I8(65).to_char(&lock), 65);
        assert_eq!(TaggedValue::I32(65).to_char(&lock), -1);
        assert_eq!(lock.take_last_error(), Some(LastError::Conversion));
    }

    #[test]
    fn object_conversion_uses_runtime_coercion() {
        let bridge = bridge();
        let lock = bridge.lock();
        let long = lock.new_long(42);
        assert_eq!(long.value().try_to_i64(&lock).unwrap(), 42);
        assert_eq!(long.value().try_to_f64(&lock).unwrap(), 42.0);
        assert_eq!(long.value().to_i32(&lock), 42);
        assert_eq!(lock.take_last_error(), None);
    }

    #[test]
    fn object_overflow_is_distinguishable() {
        let bridge = bridge();
        let lock = bridge.lock();
        let big = lock.long_from_str("123456789012345678901234567890");
        let err = big.value().try_to_i64(&lock).unwrap_err();
        assert_eq!(
            err,
            ValueError::Overflow {
                value: "123456789012345678901234567890".into(),
                to: "i64"
            }
        );
        assert_eq!(big.value().to_i64(&lock), -1);
        assert_eq!(lock.take_last_error(), Some(LastError::Overflow));

        let wide = lock.new_long(1 << 40);
        assert_eq!(wide.value().to_i32(&lock), -1);
        assert_eq!(lock.take_last_error(), Some(LastError::Overflow));
    }

    #[test]
    fn foreign_type_fault_is_drained() {
        let bridge = bridge();
        let lock = bridge.lock();
        let text = lock.new_string("nope");
        assert!(matches!(
            text.value().try_to_i64(&lock),
            Err(ValueError::Foreign(_))
        ));
        assert_eq!(text.value().to_f64(&lock), -1.0);
        assert_eq!(lock.take_last_error(), Some(LastError::Foreign));
    }

    #[test]
    fn cstr_never_converts_to_numbers() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert_eq!(TaggedValue::Cstr("5").to_i64(&lock), -1);
        assert_eq!(lock.take_last_error(), Some(LastError::Conversion));
    }
}
