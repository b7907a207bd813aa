use crate::error::ValueError;
use crate::handle::ObjectKind;
use crate::views::size_of;

typed_view! {
    /// View over a bytes or bytearray object.
    BytesRef => Bytes | ByteArray
}

impl BytesRef<'_> {
    /// Byte count, or `-1` for none.
    pub fn size(&self) -> i64 {
        size_of(self.lock, self.handle)
    }

    /// Copy of the contents; `None` for none.
    pub fn to_vec(&self) -> Option<Vec<u8>> {
        if self.is_none() {
            return None;
        }
        self.lock.drained(self.lock.runtime().bytes_of(self.handle))
    }

    /// Contents decoded as UTF-8, replacing invalid sequences.
    pub fn to_text(&self) -> Option<String> {
        self.to_vec()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Whether the buffer can be resized and written.
    pub fn is_mutable(&self) -> bool {
        self.lock.runtime().kind(self.handle) == ObjectKind::ByteArray
    }

    /// Resize a bytearray, zero-filling growth.
    pub fn resize(&self, len: usize) -> Result<(), ValueError> {
        self.lock
            .runtime()
            .bytes_resize(self.handle, len)
            .map_err(|e| self.lock.fault(e))
    }

    /// Overwrite `data.len()` bytes starting at `offset`.
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<(), ValueError> {
        self.lock
            .runtime()
            .bytes_write(self.handle, offset, data)
            .map_err(|e| self.lock.fault(e))
    }
}

typed_view! {
    /// View over a string object.
    StrRef => String
}

impl StrRef<'_> {
    /// Character count, or `-1` for none.
    pub fn size(&self) -> i64 {
        size_of(self.lock, self.handle)
    }

    /// The text; `None` for none.
    pub fn to_text(&self) -> Option<String> {
        if self.is_none() {
            return None;
        }
        self.lock.drained(self.lock.runtime().to_text(self.handle))
    }
}
