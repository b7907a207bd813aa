use std::iter::FusedIterator;

use crate::bridge::ScopedLock;
use crate::error::{Rejected, ValueError};
use crate::handle::{ObjectHandle, ObjectKind};
use crate::shared::SharedRef;
use crate::tagged::{AsObject, TaggedValue};
use crate::views::{check_index, size_of, steal, with_object};

fn fetch(lock: &ScopedLock<'_>, handle: ObjectHandle, index: usize) -> Result<TaggedValue<'static>, ValueError> {
    let runtime = lock.runtime();
    let item = match runtime.kind(handle) {
        ObjectKind::Tuple => runtime.tuple_get(handle, index),
        _ => runtime.list_get(handle, index),
    };
    item.map(TaggedValue::Object).map_err(|e| lock.fault(e))
}

/// Random-access iterator over a tuple or list, front and back.
///
/// Items are borrowed handles. A list shrunk during iteration ends the
/// iteration early instead of reading out of bounds.
#[derive(Debug, Clone)]
pub struct SeqIter<'s> {
    lock: &'s ScopedLock<'s>,
    handle: ObjectHandle,
    front: usize,
    back: usize,
}

impl<'s> SeqIter<'s> {
    fn new(lock: &'s ScopedLock<'s>, handle: ObjectHandle) -> Self {
        Self {
            lock,
            handle,
            front: 0,
            back: usize::try_from(size_of(lock, handle)).unwrap_or(0),
        }
    }

    fn fetch(&mut self, index: usize) -> Option<TaggedValue<'static>> {
        let item = fetch(self.lock, self.handle, index).ok();
        if item.is_none() {
            self.front = self.back;
        }
        item
    }
}

impl Iterator for SeqIter<'_> {
    type Item = TaggedValue<'static>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let index = self.front;
        self.front += 1;
        self.fetch(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for SeqIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        let index = self.back;
        self.fetch(index)
    }
}

impl ExactSizeIterator for SeqIter<'_> {}
impl FusedIterator for SeqIter<'_> {}

typed_view! {
    /// View over a tuple object.
    TupleRef => Tuple
}

impl<'s> TupleRef<'s> {
    /// Element count, or `-1` for none.
    pub fn size(&self) -> i64 {
        size_of(self.lock, self.handle)
    }

    /// Borrowed element at `index`.
    pub fn get(&self, index: usize) -> Result<TaggedValue<'static>, ValueError> {
        let index = check_index(index, self.size())?;
        fetch(self.lock, self.handle, index)
    }

    /// Iterate the elements.
    pub fn iter(&self) -> SeqIter<'s> {
        SeqIter::new(self.lock, self.handle)
    }
}

impl<'s> IntoIterator for TupleRef<'s> {
    type Item = TaggedValue<'static>;
    type IntoIter = SeqIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

typed_view! {
    /// View over a list object.
    ListRef => List
}

impl<'s> ListRef<'s> {
    /// Element count, or `-1` for none.
    pub fn size(&self) -> i64 {
        size_of(self.lock, self.handle)
    }

    /// Borrowed element at `index`.
    pub fn get(&self, index: usize) -> Result<TaggedValue<'static>, ValueError> {
        let index = check_index(index, self.size())?;
        fetch(self.lock, self.handle, index)
    }

    /// Iterate the elements.
    pub fn iter(&self) -> SeqIter<'s> {
        SeqIter::new(self.lock, self.handle)
    }

    /// Replace the element at `index`; the list takes its own reference.
    pub fn set_item(&self, index: usize, item: &impl AsObject) -> Result<(), ValueError> {
        let index = check_index(index, self.size())?;
        with_object(self.lock, item.as_tagged(), |child| {
            self.lock
                .runtime()
                .list_set(self.handle, index, child)
                .map_err(|e| self.lock.fault(e))
        })
    }

    /// Replace the element at `index`, handing `item`'s reference to the list.
    pub fn set_item_steal<'a>(&self, index: usize, item: SharedRef<'a>) -> Result<(), Rejected<SharedRef<'a>>> {
        let len = self.size();
        steal(self.lock, item, |child| {
            let index = check_index(index, len)?;
            self.lock
                .runtime()
                .list_set(self.handle, index, child)
                .map_err(|e| self.lock.fault(e))
        })
    }

    /// Insert before `index`; indexes past the end append.
    pub fn insert(&self, index: usize, item: &impl AsObject) -> Result<(), ValueError> {
        with_object(self.lock, item.as_tagged(), |child| self.insert_handle(index, child))
    }

    /// Append at the end.
    pub fn append(&self, item: &impl AsObject) -> Result<(), ValueError> {
        with_object(self.lock, item.as_tagged(), |child| self.append_handle(child))
    }

    /// [`insert`](Self::insert), handing `item`'s reference to the list.
    pub fn insert_steal<'a>(&self, index: usize, item: SharedRef<'a>) -> Result<(), Rejected<SharedRef<'a>>> {
        steal(self.lock, item, |child| self.insert_handle(index, child))
    }

    /// [`append`](Self::append), handing `item`'s reference to the list.
    pub fn append_steal<'a>(&self, item: SharedRef<'a>) -> Result<(), Rejected<SharedRef<'a>>> {
        steal(self.lock, item, |child| self.append_handle(child))
    }

    fn insert_handle(&self, index: usize, child: ObjectHandle) -> Result<(), ValueError> {
        self.lock
            .runtime()
            .list_insert(self.handle, index, child)
            .map_err(|e| self.lock.fault(e))
    }

    fn append_handle(&self, child: ObjectHandle) -> Result<(), ValueError> {
        self.lock
            .runtime()
            .list_append(self.handle, child)
            .map_err(|e| self.lock.fault(e))
    }
}

impl<'s> IntoIterator for ListRef<'s> {
    type Item = TaggedValue<'static>;
    type IntoIter = SeqIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
