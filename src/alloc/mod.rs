//! The allocator capability used by everything in this crate.
//!
//! An [`Allocator`] is just an `allocate`/`release` pair. Whatever state the
//! allocator needs (an arena, a pool, nothing at all for the global heap) is
//! its "context" and lives behind `&self`.
//!
//! If you don't specify an allocator when asked (`None`), we assume you meant
//! the regular `malloc()`/`free()`, which is available as [`HEAP`].

use std::{fmt, mem, ptr::NonNull};

pub mod dlmalloc;
pub mod fn_ptr;
pub mod heap;
pub(crate) mod raw;
pub mod tracing;

pub use heap::{HeapAllocator, HEAP};

/// Every block handed out by an [`Allocator`] is aligned to at least this
/// many bytes. `malloc()` always satisfies it.
pub const MIN_ALIGN: usize = mem::align_of::<usize>();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The backing allocator could not provide `size` bytes.
    OutOfMemory { size: isize },
    /// Negative sizes are never valid.
    InvalidSize { size: isize },
    /// A fixed-capacity allocator ran out of room.
    Exhausted { requested: usize, remaining: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { size } => write!(f, "out of memory allocating {size} bytes"),
            Self::InvalidSize { size } => write!(f, "invalid allocation size {size}"),
            Self::Exhausted {
                requested,
                remaining,
            } => write!(
                f,
                "allocator exhausted: requested {requested} bytes, {remaining} remaining"
            ),
        }
    }
}

impl std::error::Error for AllocError {}

/// A pluggable allocator. Sizes are `isize` so that pointer arithmetic with
/// them stays consistent in both directions.
///
/// # Safety
///
/// Implementors must guarantee that a successful `allocate(size)`
/// - returns a pointer valid for reads and writes of `size` bytes, unique
///   until it is passed to `release()`
/// - is aligned to at least [`MIN_ALIGN`]
/// - succeeds for `size == 0` with a pointer that may be passed to `release()`
pub unsafe trait Allocator {
    fn allocate(&self, size: isize) -> Result<NonNull<u8>, AllocError>;

    /// # Safety
    ///
    /// `ptr` must have come from `self.allocate(size)` with this exact `size`,
    /// and must not have been released already.
    unsafe fn release(&self, ptr: NonNull<u8>, size: isize);
}

/// The allocator to use: `alloc` if there is one, [`HEAP`] otherwise.
pub fn or_default(alloc: Option<&dyn Allocator>) -> &dyn Allocator {
    match alloc {
        Some(alloc) => alloc,
        None => &HEAP,
    }
}

/// Allocate with `alloc`, or with [`HEAP`] if no allocator was given.
pub fn allocate_or_default(
    alloc: Option<&dyn Allocator>,
    size: isize,
) -> Result<NonNull<u8>, AllocError> {
    or_default(alloc).allocate(size)
}

/// Like [`allocate_or_default()`], but for releasing.
///
/// # Safety
///
/// Same contract as [`Allocator::release()`], for whichever allocator
/// `alloc` resolves to.
pub unsafe fn release_or_default(alloc: Option<&dyn Allocator>, ptr: NonNull<u8>, size: isize) {
    unsafe { or_default(alloc).release(ptr, size) }
}

/// Checks that `size` is a valid request, converting it to a `usize`.
pub(crate) fn checked_size(size: isize) -> Result<usize, AllocError> {
    usize::try_from(size).map_err(|_| AllocError::InvalidSize { size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_resolves_to_the_heap() {
        let resolved = or_default(None) as *const dyn Allocator as *const ();
        assert_eq!(resolved, &HEAP as *const HeapAllocator as *const ());
    }

    #[test]
    fn some_is_left_alone() {
        let heap = HeapAllocator;
        let resolved = or_default(Some(&heap)) as *const dyn Allocator as *const ();
        assert_eq!(resolved, &heap as *const HeapAllocator as *const ());
    }

    #[test]
    fn allocate_with_backup_round_trips() {
        let data = allocate_or_default(None, 4).unwrap();
        unsafe {
            data.cast::<u32>().as_ptr().write(0xdead_beef);
            assert_eq!(data.cast::<u32>().as_ptr().read(), 0xdead_beef);
            release_or_default(None, data, 4);
        }
    }

    #[test]
    fn negative_sizes_are_rejected() {
        assert_eq!(checked_size(-1), Err(AllocError::InvalidSize { size: -1 }));
        assert_eq!(checked_size(7), Ok(7));
    }
}
