//! Error types for value conversion, container access and foreign runtime faults.

use std::fmt;

use crate::handle::ObjectKind;

/// Category of a fault raised inside the foreign runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignErrorKind {
    /// Operation applied to an object of the wrong type.
    Type,
    /// Right type, unacceptable value (e.g. unparsable numeric text).
    Value,
    /// Numeric result does not fit the requested representation.
    Overflow,
    /// Sequence index out of range.
    Index,
    /// Mapping key missing.
    Key,
    /// Comparison or copy recursed too deeply.
    Recursion,
    /// Anything else, including stale handles.
    Runtime,
}

impl ForeignErrorKind {
    /// Name used when the fault is logged.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "TypeError",
            Self::Value => "ValueError",
            Self::Overflow => "OverflowError",
            Self::Index => "IndexError",
            Self::Key => "KeyError",
            Self::Recursion => "RecursionError",
            Self::Runtime => "RuntimeError",
        }
    }
}

impl fmt::Display for ForeignErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault reported by the foreign runtime.
///
/// The value layer never lets these cross its boundary as panics: every call
/// into the runtime either returns the fault to a `try_*` caller or drains it
/// through [`ScopedLock::drain`](crate::ScopedLock::drain), which logs it and
/// records [`LastError::Foreign`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ForeignError {
    /// Fault category.
    pub kind: ForeignErrorKind,
    /// Runtime-provided message.
    pub message: String,
}

impl ForeignError {
    /// Create a fault of the given kind.
    pub fn new(kind: ForeignErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`ForeignErrorKind::Type`] fault.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ForeignErrorKind::Type, message)
    }

    /// Shorthand for a [`ForeignErrorKind::Value`] fault.
    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ForeignErrorKind::Value, message)
    }

    /// Shorthand for a [`ForeignErrorKind::Overflow`] fault.
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(ForeignErrorKind::Overflow, message)
    }

    /// Shorthand for a [`ForeignErrorKind::Index`] fault.
    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ForeignErrorKind::Index, message)
    }

    /// Shorthand for a [`ForeignErrorKind::Runtime`] fault.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ForeignErrorKind::Runtime, message)
    }
}

/// Result alias for calls into a [`ForeignRuntime`](crate::ForeignRuntime).
pub type ForeignResult<T> = Result<T, ForeignError>;

/// Errors from value conversion and typed-view operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// The value's tag or object kind cannot be narrowed to the target.
    #[error("cannot convert {from} to {to}")]
    Conversion {
        /// Source tag or kind name.
        from: &'static str,
        /// Requested target.
        to: &'static str,
    },

    /// The numeric value exceeds the target's range.
    #[error("{value} is out of range for {to}")]
    Overflow {
        /// Rendered source value.
        value: String,
        /// Requested target.
        to: &'static str,
    },

    /// The foreign runtime reported a fault.
    #[error("foreign runtime fault: {0}")]
    Foreign(#[from] ForeignError),

    /// An object-only operation received a native scalar.
    #[error("expected an object, found {0}")]
    NotAnObject(&'static str),

    /// Sequence access outside `0..len`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: i64,
        /// Sequence length at the time of access.
        len: i64,
    },

    /// Keyed access found no entry.
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    /// A checked refinement met an object of another kind.
    #[error("expected {expected} object, found {found}")]
    KindMismatch {
        /// Kind the caller asked for.
        expected: ObjectKind,
        /// Kind actually found.
        found: ObjectKind,
    },
}

impl ValueError {
    /// The [`LastError`] code recorded when this error is turned into a sentinel.
    pub const fn code(&self) -> LastError {
        match self {
            Self::Conversion { .. } | Self::NotAnObject(_) | Self::KindMismatch { .. } => {
                LastError::Conversion
            }
            Self::Overflow { .. } => LastError::Overflow,
            Self::Foreign(_) => LastError::Foreign,
            Self::IndexOutOfRange { .. } | Self::KeyNotFound(_) => LastError::Fetch,
        }
    }
}

/// Last error code recorded by a sentinel-returning operation.
///
/// Sentinel forms (`-1`, empty values) cannot carry the reason, so the bridge
/// keeps the most recent one until [`ScopedLock::take_last_error`](crate::ScopedLock::take_last_error)
/// reads and clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LastError {
    /// Tag or kind mismatch on narrowing.
    Conversion = 1,
    /// Numeric range exceeded.
    Overflow = 2,
    /// The runtime reported a fault.
    Foreign = 3,
    /// Index or key lookup failed.
    Fetch = 4,
}

impl LastError {
    pub(crate) const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Conversion),
            2 => Some(Self::Overflow),
            3 => Some(Self::Foreign),
            4 => Some(Self::Fetch),
            _ => None,
        }
    }
}

/// Errors from bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The ops table cannot be swapped while other handles are alive.
    #[error("ops table is in use by {handles} other bridge handle(s)")]
    OpsInUse {
        /// Number of other live handles, wrappers included.
        handles: usize,
    },
}

/// A steal-flavoured insertion that failed.
///
/// The container did not take the child, so ownership of `item` returns to
/// the caller, who decides whether to retry or release it.
#[derive(Debug, thiserror::Error)]
#[error("insertion rejected: {error}")]
pub struct Rejected<T: fmt::Debug> {
    /// Why the container refused the child.
    pub error: ValueError,
    /// The child, still owned by the caller.
    pub item: T,
}

impl<T: fmt::Debug> Rejected<T> {
    /// Recover the child.
    pub fn into_item(self) -> T {
        self.item
    }

    /// Split into the error and the child.
    pub fn into_parts(self) -> (ValueError, T) {
        (self.error, self.item)
    }
}
