use std::ptr::NonNull;

use super::{checked_size, AllocError, Allocator};
use crate::util::{assert::aligned_to, hint::cold};

pub(crate) mod c {
    pub use libc::{free, malloc};
}

/// The platform heap: plain `malloc()` and `free()`. Holds no state, so a
/// single `static` instance ([`HEAP`]) is shared by the whole process.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

/// The default allocator, used wherever an allocator is optional and none was
/// given.
pub static HEAP: HeapAllocator = HeapAllocator;

// SAFETY:
// - `malloc()` returns blocks of at least the requested size, suitably aligned
//   for any fundamental type, so at least `MIN_ALIGN`
// - zero-size requests are bumped to one byte, so we never see the
//   "may return null" case for `malloc(0)`
unsafe impl Allocator for HeapAllocator {
    fn allocate(&self, size: isize) -> Result<NonNull<u8>, AllocError> {
        let bytes = checked_size(size)?;
        // SAFETY: `malloc()` has no preconditions.
        let data = unsafe { c::malloc(bytes.max(1)) } as *mut u8;
        match NonNull::new(data) {
            Some(data) => {
                debug_assert!(aligned_to(data.as_ptr(), super::MIN_ALIGN));
                Ok(data)
            }
            None => cold(|| Err(AllocError::OutOfMemory { size })),
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, _: isize) {
        // SAFETY: Caller guarantees `ptr` came from `allocate()` above, and so
        //         from `malloc()`, and that it is not freed yet.
        unsafe { c::free(ptr.as_ptr() as _) }
    }
}
