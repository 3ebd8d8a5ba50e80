use std::{mem, ptr::NonNull, slice};

use super::{checked_size, AllocError, Allocator};

/// An owning pointer to `size` bytes obtained from some [`Allocator`], that
/// has no RAII -- you must give it back yourself, using `release()`, to the
/// same allocator.
pub(crate) struct Block {
    data: NonNull<u8>,
    size: usize,
}

impl Block {
    pub fn allocate<A>(alloc: &A, size: isize) -> Result<Self, AllocError>
    where
        A: Allocator + ?Sized,
    {
        let bytes = checked_size(size)?;
        let data = alloc.allocate(size)?;
        // SAFETY: `allocate()` guarantees `data` is valid for writes of
        //         `bytes` bytes. Zeroing means every later read sees init
        //         memory, whatever the allocator gave us.
        unsafe { data.as_ptr().write_bytes(0, bytes) };
        Ok(Self { data, size: bytes })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub const fn as_ptr(&self) -> *mut u8 {
        self.data.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `data` is valid for `size` bytes for as long as we own it,
        //         and was zeroed by `allocate()`.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.size) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: As above, and `&mut self` makes this the only reference.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.size) }
    }

    pub fn as_words(&self) -> &[usize] {
        // SAFETY:
        // - Every allocator aligns to at least `MIN_ALIGN`, which is the
        //   alignment of `usize`
        // - Trailing bytes that don't make up a whole word are ignored
        unsafe {
            slice::from_raw_parts(
                self.data.as_ptr() as *const usize,
                self.size / mem::size_of::<usize>(),
            )
        }
    }

    pub fn as_words_mut(&mut self) -> &mut [usize] {
        // SAFETY: As `as_words()`, and `&mut self` makes this unique.
        unsafe {
            slice::from_raw_parts_mut(
                self.data.as_ptr() as *mut usize,
                self.size / mem::size_of::<usize>(),
            )
        }
    }

    /// # Safety
    ///
    /// `alloc` must be the allocator this block came from.
    pub unsafe fn release<A>(self, alloc: &A)
    where
        A: Allocator + ?Sized,
    {
        // `size` fit in an `isize` when we allocated it.
        unsafe { alloc.release(self.data, self.size as isize) }
    }
}
