//! Object constructors available under the lock.
//!
//! Every constructor returns a fresh [`SharedRef`]. A runtime fault is
//! drained (logged and recorded as [`LastError::Foreign`]) and the none
//! object comes back in its place, so callers can chain constructors and
//! check [`ScopedLock::take_last_error`] once.
//!
//! [`LastError::Foreign`]: crate::LastError::Foreign

use crate::bridge::ScopedLock;
use crate::error::ForeignResult;
use crate::handle::ObjectHandle;
use crate::ops::{scalar_object, text_of};
use crate::shared::SharedRef;
use crate::tagged::TaggedValue;

impl ScopedLock<'_> {
    fn adopt(&self, created: ForeignResult<ObjectHandle>) -> SharedRef<'static> {
        match created {
            Ok(handle) => SharedRef::from_new_reference(self.bridge(), TaggedValue::Object(handle)),
            Err(e) => {
                self.drain(e);
                self.none_ref()
            }
        }
    }

    /// Object for `value`, with a new reference; `Empty` maps to none.
    fn object_for(&self, value: TaggedValue<'_>) -> ForeignResult<ObjectHandle> {
        scalar_object(self.runtime(), value).unwrap_or_else(|| {
            let none = self.runtime().none();
            self.runtime().incref(none);
            Ok(none)
        })
    }

    /// A new share of the none object.
    pub fn none_ref(&self) -> SharedRef<'static> {
        SharedRef::share(self, self.none())
    }

    /// Boolean object.
    pub fn new_bool(&self, value: bool) -> SharedRef<'static> {
        self.adopt(self.runtime().new_bool(value))
    }

    /// Integer object.
    pub fn new_long(&self, value: i64) -> SharedRef<'static> {
        self.adopt(self.runtime().new_long(value))
    }

    /// Integer object truncated from a float. NaN and infinities fault.
    pub fn long_from_f64(&self, value: f64) -> SharedRef<'static> {
        self.adopt(self.runtime().long_from_f64(value))
    }

    /// Integer object parsed from decimal text, beyond `i64` if needed.
    pub fn long_from_str(&self, text: &str) -> SharedRef<'static> {
        self.adopt(self.runtime().long_from_str(text))
    }

    /// Float object.
    pub fn new_float(&self, value: f64) -> SharedRef<'static> {
        self.adopt(self.runtime().new_float(value))
    }

    /// Float object parsed from text.
    pub fn float_from_str(&self, text: &str) -> SharedRef<'static> {
        self.adopt(self.runtime().float_from_str(text))
    }

    /// Immutable bytes object.
    pub fn new_bytes(&self, data: &[u8]) -> SharedRef<'static> {
        self.adopt(self.runtime().new_bytes(data))
    }

    /// Mutable bytearray object.
    pub fn new_bytearray(&self, data: &[u8]) -> SharedRef<'static> {
        self.adopt(self.runtime().new_bytearray(data))
    }

    /// String object.
    pub fn new_string(&self, text: &str) -> SharedRef<'static> {
        self.adopt(self.runtime().new_string(text))
    }

    /// String conversion of any value. Floats render with six decimals.
    pub fn string_of(&self, value: TaggedValue<'_>) -> SharedRef<'static> {
        match text_of(self.runtime(), value) {
            Some(Ok(text)) => self.new_string(&text),
            Some(Err(e)) => self.adopt(Err(e)),
            None => self.new_string(""),
        }
    }

    /// The runtime's repr of `value` as a string object.
    pub fn repr_of(&self, value: TaggedValue<'_>) -> SharedRef<'static> {
        let runtime = self.runtime();
        let text = self.object_for(value).and_then(|handle| {
            let repr = runtime.repr(handle);
            runtime.decref(handle);
            repr
        });
        match text {
            Ok(text) => self.new_string(&text),
            Err(e) => self.adopt(Err(e)),
        }
    }

    /// Type name of `value` as a string object; native values use their tag
    /// name.
    pub fn type_name_of(&self, value: TaggedValue<'_>) -> SharedRef<'static> {
        match value.object_handle() {
            Some(handle) => match self.runtime().type_name(handle) {
                Ok(name) => self.new_string(&name),
                Err(e) => self.adopt(Err(e)),
            },
            None => self.new_string(value.tag().name()),
        }
    }

    /// Tuple of `items`; native values are converted, `Empty` becomes none.
    pub fn new_tuple(&self, items: &[TaggedValue<'_>]) -> SharedRef<'static> {
        let runtime = self.runtime();
        let mut handles = Vec::with_capacity(items.len());
        let mut fault = None;
        for &item in items {
            match self.object_for(item) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    fault = Some(e);
                    break;
                }
            }
        }
        let created = match fault {
            Some(e) => Err(e),
            None => runtime.new_tuple(&handles),
        };
        for handle in handles {
            runtime.decref(handle);
        }
        self.adopt(created)
    }

    /// Tuple of `len` independent copies of `fill`.
    pub fn tuple_filled(&self, len: usize, fill: TaggedValue<'_>) -> SharedRef<'static> {
        let runtime = self.runtime();
        let seed = match self.object_for(fill) {
            Ok(seed) => seed,
            Err(e) => return self.adopt(Err(e)),
        };
        let mut copies = Vec::with_capacity(len);
        let mut created = Ok(());
        for _ in 0..len {
            match runtime.deep_copy(seed) {
                Ok(copy) => copies.push(copy),
                Err(e) => {
                    created = Err(e);
                    break;
                }
            }
        }
        let tuple = created.and_then(|()| runtime.new_tuple(&copies));
        for copy in copies {
            runtime.decref(copy);
        }
        runtime.decref(seed);
        self.adopt(tuple)
    }

    /// Tuple of `len` nones.
    pub fn tuple_of_len(&self, len: usize) -> SharedRef<'static> {
        let none = self.runtime().none();
        self.adopt(self.runtime().new_tuple(&vec![none; len]))
    }

    /// Empty list.
    pub fn new_list(&self) -> SharedRef<'static> {
        self.adopt(self.runtime().new_list())
    }

    /// Empty dict.
    pub fn new_dict(&self) -> SharedRef<'static> {
        self.adopt(self.runtime().new_dict())
    }

    /// Empty set.
    pub fn new_set(&self) -> SharedRef<'static> {
        self.adopt(self.runtime().new_set())
    }

    /// Module with an empty namespace apart from `__name__`.
    pub fn new_module(&self, name: &str) -> SharedRef<'static> {
        self.adopt(self.runtime().new_module(name))
    }

    /// Object form of `value`: native values are boxed, objects shared,
    /// `Empty` becomes none.
    pub fn to_object(&self, value: TaggedValue<'_>) -> SharedRef<'static> {
        self.adopt(self.object_for(value))
    }
}
