//! Object handles and kinds.

use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;

/// Address of an object living in the foreign runtime.
///
/// A handle never holds null: the "no object" state is the runtime's none
/// sentinel, reached through [`TaggedValue::object`](crate::TaggedValue::object).
/// Handles carry no ownership; reference counting is the business of
/// [`OwnedValue`](crate::OwnedValue) and [`SharedRef`](crate::SharedRef).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(NonZeroUsize);

impl ObjectHandle {
    /// Wrap a raw address. Returns `None` for zero.
    pub const fn from_addr(addr: usize) -> Option<Self> {
        match NonZeroUsize::new(addr) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Wrap a raw object pointer. Returns `None` for null.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        Self::from_addr(ptr as usize)
    }

    /// The raw address.
    #[inline]
    pub const fn addr(self) -> usize {
        self.0.get()
    }

    /// The raw address as an untyped pointer, for handing back to C.
    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle({:#x})", self.0)
    }
}

impl fmt::LowerHex for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0.get(), f)
    }
}

/// Concrete kind of a foreign object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// The runtime's none singleton.
    NoneType,
    /// Boolean singletons.
    Bool,
    /// Arbitrary-precision integer.
    Long,
    /// Double-precision float.
    Float,
    /// Immutable byte string.
    Bytes,
    /// Mutable byte buffer.
    ByteArray,
    /// Unicode text.
    String,
    /// Immutable sequence.
    Tuple,
    /// Mutable sequence.
    List,
    /// Unordered unique collection.
    Set,
    /// String-keyed mapping.
    Dict,
    /// Named namespace with its own dict.
    Module,
    /// Anything the runtime defines beyond the inherent kinds.
    Custom,
}

impl ObjectKind {
    /// Short name used in errors and reflection.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoneType => "none",
            Self::Bool => "bool",
            Self::Long => "long",
            Self::Float => "float",
            Self::Bytes => "bytes",
            Self::ByteArray => "bytearray",
            Self::String => "string",
            Self::Tuple => "tuple",
            Self::List => "list",
            Self::Set => "set",
            Self::Dict => "dict",
            Self::Module => "module",
            Self::Custom => "custom",
        }
    }

    /// Whether values of this kind have a length.
    pub const fn is_sized(self) -> bool {
        matches!(
            self,
            Self::Bytes
                | Self::ByteArray
                | Self::String
                | Self::Tuple
                | Self::List
                | Self::Set
                | Self::Dict
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_not_a_handle() {
        assert_eq!(ObjectHandle::from_addr(0), None);
        assert_eq!(ObjectHandle::from_ptr(std::ptr::null_mut()), None);
    }

    #[test]
    fn pointer_round_trip_keeps_address() {
        let handle = ObjectHandle::from_addr(0x40).unwrap();
        assert_eq!(handle.as_ptr() as usize, 0x40);
        assert_eq!(ObjectHandle::from_ptr(handle.as_ptr()), Some(handle));
        assert_eq!(format!("{handle:?}"), "ObjectHandle(0x40)");
    }

    #[test]
    fn sized_kinds() {
        assert!(ObjectKind::Dict.is_sized());
        assert!(ObjectKind::ByteArray.is_sized());
        assert!(!ObjectKind::Long.is_sized());
        assert!(!ObjectKind::Module.is_sized());
    }
}
