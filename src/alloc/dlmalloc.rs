use std::{ptr::NonNull, sync::Mutex};

use dlmalloc::Dlmalloc;

use super::{checked_size, AllocError, Allocator, MIN_ALIGN};
use crate::util::hint::cold;

// https://gee.cs.oswego.edu/dl/html/malloc.html

/// `dlmalloc()` guarantees this much alignment without falling back to
/// `memalign()`.
pub const DLMALLOC_MIN_ALIGN: usize = 16;

/// A private `dlmalloc()` heap. Unlike [`HeapAllocator`](super::HeapAllocator)
/// this has real state (its own free lists and segments), which is kept
/// behind a `Mutex` so the allocator can be shared between threads.
pub struct DlMallocAlloc {
    heap: Mutex<Dlmalloc>,
}

impl DlMallocAlloc {
    pub const fn new() -> Self {
        Self {
            heap: Mutex::new(Dlmalloc::new()),
        }
    }

    fn with_heap<R>(&self, f: impl FnOnce(&mut Dlmalloc) -> R) -> R {
        // A panic while holding the lock can't leave the heap half-updated:
        // dlmalloc calls don't unwind.
        let mut heap = match self.heap.lock() {
            Ok(heap) => heap,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut heap)
    }
}

impl Default for DlMallocAlloc {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY:
// - dlmalloc returns blocks of at least the requested size, aligned to the
//   alignment we pass, which is at least `MIN_ALIGN`
// - zero-size requests are bumped to one byte
unsafe impl Allocator for DlMallocAlloc {
    fn allocate(&self, size: isize) -> Result<NonNull<u8>, AllocError> {
        let bytes = checked_size(size)?.max(1);
        // SAFETY: `DLMALLOC_MIN_ALIGN` is a power of two and `bytes` is
        //         non-zero.
        let data = self.with_heap(|heap| unsafe { heap.malloc(bytes, Self::ALIGN) });
        match NonNull::new(data) {
            Some(data) => Ok(data),
            None => cold(|| Err(AllocError::OutOfMemory { size })),
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: isize) {
        let bytes = (size as usize).max(1);
        // SAFETY: Identical contract to caller: `ptr` came from `allocate()`
        //         with the same `size`, so with the same `bytes` and align.
        self.with_heap(|heap| unsafe { heap.free(ptr.as_ptr(), bytes, Self::ALIGN) });
    }
}

impl DlMallocAlloc {
    const ALIGN: usize = if DLMALLOC_MIN_ALIGN > MIN_ALIGN {
        DLMALLOC_MIN_ALIGN
    } else {
        MIN_ALIGN
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_do_not_overlap() {
        let alloc = DlMallocAlloc::new();
        let a = alloc.allocate(32).unwrap();
        let b = alloc.allocate(32).unwrap();
        unsafe {
            a.as_ptr().write_bytes(1, 32);
            b.as_ptr().write_bytes(2, 32);
            assert!(std::slice::from_raw_parts(a.as_ptr(), 32)
                .iter()
                .all(|&x| x == 1));
            alloc.release(a, 32);
            alloc.release(b, 32);
        }
    }

    #[test]
    fn blocks_are_aligned() {
        let alloc = DlMallocAlloc::new();
        let a = alloc.allocate(3).unwrap();
        assert!(crate::util::assert::aligned_to(a.as_ptr(), DLMALLOC_MIN_ALIGN));
        unsafe { alloc.release(a, 3) };
    }
}
