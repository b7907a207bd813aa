use std::iter::FusedIterator;

use crate::bridge::ScopedLock;
use crate::error::{Rejected, ValueError};
use crate::handle::ObjectHandle;
use crate::shared::SharedRef;
use crate::tagged::{AsObject, TaggedValue};
use crate::views::{size_of, steal, with_object};

typed_view! {
    /// View over a dict object with string keys.
    DictRef => Dict
}

impl<'s> DictRef<'s> {
    /// Entry count, or `-1` for none.
    pub fn size(&self) -> i64 {
        size_of(self.lock, self.handle)
    }

    /// Borrowed value for `key`; `None` when absent or on a fault.
    pub fn get(&self, key: &str) -> Option<TaggedValue<'static>> {
        self.lock
            .drained(self.lock.runtime().dict_get(self.handle, key))
            .flatten()
            .map(TaggedValue::Object)
    }

    /// Borrowed value for `key`, with a missing key as an error.
    pub fn get_item(&self, key: &str) -> Result<TaggedValue<'static>, ValueError> {
        match self.lock.runtime().dict_get(self.handle, key) {
            Ok(Some(item)) => Ok(TaggedValue::Object(item)),
            Ok(None) => Err(ValueError::KeyNotFound(key.to_owned())),
            Err(e) => Err(self.lock.fault(e)),
        }
    }

    /// Whether `key` is bound.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Bind `key`; the dict takes its own reference.
    pub fn set(&self, key: &str, item: &impl AsObject) -> Result<(), ValueError> {
        with_object(self.lock, item.as_tagged(), |child| self.set_handle(key, child))
    }

    /// Bind `key`, handing `item`'s reference to the dict.
    pub fn set_steal<'a>(&self, key: &str, item: SharedRef<'a>) -> Result<(), Rejected<SharedRef<'a>>> {
        steal(self.lock, item, |child| self.set_handle(key, child))
    }

    /// Shallow copy as a new dict.
    pub fn copy(&self) -> Result<SharedRef<'static>, ValueError> {
        let copy = self
            .lock
            .runtime()
            .dict_copy(self.handle)
            .map_err(|e| self.lock.fault(e))?;
        Ok(SharedRef::from_new_reference(
            self.lock.bridge(),
            TaggedValue::Object(copy),
        ))
    }

    /// Iterate `(key, value)` pairs in insertion order.
    ///
    /// The dict must not be mutated while the iterator is live.
    pub fn iter(&self) -> DictIter<'s> {
        DictIter {
            lock: self.lock,
            handle: self.handle,
            cursor: 0,
            done: self.is_none(),
        }
    }

    fn set_handle(&self, key: &str, child: ObjectHandle) -> Result<(), ValueError> {
        self.lock
            .runtime()
            .dict_set(self.handle, key, child)
            .map_err(|e| self.lock.fault(e))
    }
}

impl<'s> IntoIterator for DictRef<'s> {
    type Item = (TaggedValue<'static>, TaggedValue<'static>);
    type IntoIter = DictIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over a dict's borrowed `(key, value)` pairs.
#[derive(Debug, Clone)]
pub struct DictIter<'s> {
    lock: &'s ScopedLock<'s>,
    handle: ObjectHandle,
    cursor: usize,
    done: bool,
}

impl Iterator for DictIter<'_> {
    type Item = (TaggedValue<'static>, TaggedValue<'static>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let entry = self.lock.runtime().dict_next(self.handle, &mut self.cursor);
        self.done = entry.is_none();
        entry.map(|(key, value)| (TaggedValue::Object(key), TaggedValue::Object(value)))
    }
}

impl FusedIterator for DictIter<'_> {}

typed_view! {
    /// View over a set object.
    SetRef => Set
}

impl<'s> SetRef<'s> {
    /// Item count, or `-1` for none.
    pub fn size(&self) -> i64 {
        size_of(self.lock, self.handle)
    }

    /// Add `item` unless an equal one is present.
    pub fn add(&self, item: &impl AsObject) -> Result<(), ValueError> {
        with_object(self.lock, item.as_tagged(), |child| {
            self.lock
                .runtime()
                .set_add(self.handle, child)
                .map_err(|e| self.lock.fault(e))
        })
    }

    /// Iterate the borrowed items.
    ///
    /// The set must not be mutated while the iterator is live.
    pub fn iter(&self) -> SetIter<'s> {
        SetIter {
            lock: self.lock,
            handle: self.handle,
            cursor: 0,
            done: self.is_none(),
        }
    }
}

impl<'s> IntoIterator for SetRef<'s> {
    type Item = TaggedValue<'static>;
    type IntoIter = SetIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over a set's borrowed items.
#[derive(Debug, Clone)]
pub struct SetIter<'s> {
    lock: &'s ScopedLock<'s>,
    handle: ObjectHandle,
    cursor: usize,
    done: bool,
}

impl Iterator for SetIter<'_> {
    type Item = TaggedValue<'static>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.lock.runtime().set_next(self.handle, &mut self.cursor);
        self.done = item.is_none();
        item.map(TaggedValue::Object)
    }
}

impl FusedIterator for SetIter<'_> {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::Bridge;
    use crate::heap::HeapRuntime;
    use pretty_assertions::assert_eq;

    #[test]
    fn dict_iterates_in_insertion_order() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let dict = lock.new_dict();
        let view = DictRef::new(&lock, &dict);
        view.set("b", &TaggedValue::I64(2)).unwrap();
        view.set("a", &TaggedValue::Cstr("x")).unwrap();

        let pairs: Vec<(String, String)> = view
            .iter()
            .map(|(k, v)| {
                let key = lock.runtime().to_text(k.object_handle().unwrap()).unwrap();
                let value = lock.runtime().repr(v.object_handle().unwrap()).unwrap();
                (key, value)
            })
            .collect();
        assert_eq!(
            pairs,
            [("b".to_owned(), "2".to_owned()), ("a".to_owned(), "'x'".to_owned())]
        );
    }

    #[test]
    fn missing_key() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let dict = lock.new_dict();
        let view = DictRef::new(&lock, &dict);
        assert_eq!(view.get("nope"), None);
        assert!(!view.contains("nope"));
        assert_eq!(
            view.get_item("nope"),
            Err(ValueError::KeyNotFound("nope".to_owned()))
        );
    }

    #[test]
    fn copy_is_shallow_and_independent() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let dict = lock.new_dict();
        let view = DictRef::new(&lock, &dict);
        let inner = lock.new_list();
        view.set("inner", &inner).unwrap();

        let copy = view.copy().unwrap();
        let copy_view = DictRef::new(&lock, &copy);
        copy_view.set("extra", &TaggedValue::I64(0)).unwrap();

        assert_eq!(view.size(), 1);
        assert_eq!(copy_view.size(), 2);
        assert!(lock.is_same(copy_view.get("inner").unwrap(), inner.value()));
    }

    #[test]
    fn set_ignores_duplicates() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let set = lock.new_set();
        let view = SetRef::new(&lock, &set);
        view.add(&TaggedValue::I64(1)).unwrap();
        view.add(&TaggedValue::I64(1)).unwrap();
        view.add(&TaggedValue::Cstr("one")).unwrap();
        assert_eq!(view.size(), 2);
        assert_eq!(view.iter().count(), 2);
    }

    #[test]
    fn none_views_iterate_nothing() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let none = lock.none();
        assert_eq!(DictRef::new(&lock, &none).iter().count(), 0);
        assert_eq!(SetRef::new(&lock, &none).iter().count(), 0);
    }
}
