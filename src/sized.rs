//! Generic sized data. Most of this crate takes [`SizedView`]s, because they
//! make operations on typeless bytes *significantly* easier.

use std::{fmt, marker::PhantomData, ptr::NonNull, slice};

use bytemuck::Pod;

/// A non-owning `(pointer, length)` view of some bytes. Constructing or
/// returning one never implies responsibility for freeing anything.
///
/// Two views are equal when they describe the same range; the bytes behind
/// them are never compared.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizedView<'a> {
    data: NonNull<u8>,
    len: usize,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> SizedView<'a> {
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            // A slice pointer is never null, even for an empty slice.
            data: NonNull::from(bytes).cast(),
            len: bytes.len(),
            _marker: PhantomData,
        }
    }

    /// The bytes of a plain value.
    pub fn of<T: Pod>(value: &'a T) -> Self {
        Self::from_slice(bytemuck::bytes_of(value))
    }

    /// The bytes of a slice of plain values.
    pub fn of_slice<T: Pod>(values: &'a [T]) -> Self {
        Self::from_slice(bytemuck::cast_slice(values))
    }

    pub const fn empty() -> Self {
        Self {
            data: NonNull::dangling(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `data` must be valid for reads of `len` bytes, and those bytes must not
    /// be mutated, for all of `'a`.
    pub const unsafe fn from_raw_parts(data: NonNull<u8>, len: usize) -> Self {
        Self {
            data,
            len,
            _marker: PhantomData,
        }
    }

    pub const fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &'a [u8] {
        // SAFETY: Every constructor guarantees `data` is readable for `len`
        //         bytes, unchanged, for `'a`.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

impl Default for SizedView<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> From<&'a [u8]> for SizedView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for SizedView<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::from_slice(bytes)
    }
}

impl<'a> From<&'a str> for SizedView<'a> {
    fn from(s: &'a str) -> Self {
        Self::from_slice(s.as_bytes())
    }
}

impl fmt::Debug for SizedView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizedView")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_covers_the_whole_value() {
        let n = 0x0102_0304u32;
        let view = SizedView::of(&n);
        assert_eq!(view.len(), 4);
        assert_eq!(view.as_slice(), &n.to_ne_bytes());
        assert_eq!(view.as_ptr(), &n as *const u32 as *const u8);
    }

    #[test]
    fn equality_is_structural() {
        let a = [1u8, 2, 3];
        let b = [1u8, 2, 3];
        assert_eq!(SizedView::from(&a), SizedView::from(&a));
        assert_ne!(SizedView::from(&a), SizedView::from(&b));
        assert_ne!(SizedView::from(&a[..2]), SizedView::from(&a[..]));
    }

    #[test]
    fn empty_views() {
        assert!(SizedView::empty().is_empty());
        assert_eq!(SizedView::empty().as_slice(), &[] as &[u8]);
        assert!(SizedView::from("").is_empty());
    }

    #[test]
    fn of_slice_spans_every_element() {
        let words = [1u16, 2, 3];
        assert_eq!(SizedView::of_slice(&words).len(), 6);
    }
}
