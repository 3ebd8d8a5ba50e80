use std::{cell::Cell, io, ptr::NonNull};

use libc::{mmap, munmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
use log::debug;
use once_cell::sync::Lazy;

use crate::{
    alloc::{checked_size, AllocError, Allocator},
    config::{ArenaConfig, ConfigError},
    util::{hint::cold, num::round_up},
};

static PAGE_SIZE: Lazy<usize> = Lazy::new(page_size::get);

#[cfg(target_os = "linux")]
const MAP_FLAGS: libc::c_int = MAP_PRIVATE | MAP_ANONYMOUS | libc::MAP_NORESERVE;
#[cfg(not(target_os = "linux"))]
const MAP_FLAGS: libc::c_int = MAP_PRIVATE | MAP_ANONYMOUS;

pub struct MmapRegion {
    ptr: NonNull<u8>,
    size: usize,
}

impl MmapRegion {
    /// `mmap()` a read/write, page-aligned region of at least `size` bytes
    /// (rounded up to whole pages, and at least 1 page).
    pub fn map(size: usize) -> io::Result<MmapRegion> {
        let size = round_up(size.max(1), *PAGE_SIZE)
            .ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))?;
        // SAFETY: An anonymous private mapping at a kernel-chosen address
        //         can't alias anything we already own.
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_FLAGS,
                -1,
                0,
            )
        };
        if ptr == MAP_FAILED {
            return cold(|| Err(io::Error::last_os_error()));
        }
        match NonNull::new(ptr as *mut u8) {
            Some(ptr) => Ok(MmapRegion { ptr, size }),
            None => Err(io::Error::from(io::ErrorKind::OutOfMemory)),
        }
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        // SAFETY:
        // - The address must be a multiple of the page size. This is
        //   guaranteed because the region is only ever constructed by `mmap()`
        // - We unmap exactly the `size` bytes we mapped, once.
        unsafe {
            munmap(self.ptr.as_ptr() as _, self.size);
        }
    }
}

/// A simple stack (bump) allocator over a [`MmapRegion`]. `allocate()` is
/// just a sp bump and `release()` is a nop; once `capacity` bytes are used up,
/// every further allocation fails with [`AllocError::Exhausted`] until the
/// arena is `reset()`.
///
/// Uses a `Cell` for the stack pointer, so it is not `Sync`: one thread at a
/// time.
pub struct StackAlloc {
    arena: MmapRegion,
    capacity: usize,
    align: usize,
    sp: Cell<usize>,
}

impl StackAlloc {
    /// Construct a new [`StackAlloc`], that can hold up to `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_config(&ArenaConfig::new(capacity))
    }

    pub fn with_config(config: &ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!("StackAlloc::with_config({config:?})");
        Ok(Self {
            arena: MmapRegion::map(config.capacity).map_err(ConfigError::Map)?,
            capacity: config.capacity,
            align: config.align,
            sp: Cell::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes handed out so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.sp.get()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.sp.get()
    }

    /// Forget every allocation. Needs `&mut self`, so nothing borrowed from
    /// this allocator (such as a tuple) can still be alive.
    pub fn reset(&mut self) {
        self.sp.set(0);
    }
}

// SAFETY:
// - Every block starts at a multiple of `align` from the page-aligned region
//   start, and `align >= MIN_ALIGN` is checked by `ArenaConfig::validate()`
// - Blocks never overlap: `sp` only moves forward until `reset()`, which
//   requires unique access
// - Zero-size blocks still reserve one byte, so every live block has its own
//   address
unsafe impl Allocator for StackAlloc {
    fn allocate(&self, size: isize) -> Result<NonNull<u8>, AllocError> {
        let size = checked_size(size)?;
        let exhausted = AllocError::Exhausted {
            requested: size,
            remaining: self.remaining(),
        };
        let start = round_up(self.sp.get(), self.align).ok_or(exhausted)?;
        let end = start.checked_add(size.max(1)).ok_or(exhausted)?;
        if end > self.capacity {
            return cold(|| Err(exhausted));
        }
        self.sp.set(end);
        // SAFETY: `start <= capacity <= arena.size`, so this is in bounds or
        //         one past the end of the mapping.
        Ok(unsafe { NonNull::new_unchecked(self.arena.ptr.as_ptr().add(start)) })
    }

    unsafe fn release(&self, _: NonNull<u8>, _: isize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::assert::aligned_to;

    #[test]
    fn bumps_by_aligned_sizes() {
        let alloc = StackAlloc::new(100).unwrap();
        let a = alloc.allocate(3).unwrap();
        let b = alloc.allocate(5).unwrap();
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
        assert!(aligned_to(b.as_ptr(), 16));
        assert_eq!(alloc.used(), 21);
    }

    #[test]
    fn fails_once_exhausted() {
        let alloc = StackAlloc::new(32).unwrap();
        alloc.allocate(20).unwrap();
        assert_eq!(
            alloc.allocate(20),
            Err(AllocError::Exhausted {
                requested: 20,
                remaining: 12
            })
        );
        assert!(alloc.allocate(12).is_err());
        // even a zero-size block takes a byte
        assert!(alloc.allocate(0).is_err());
    }

    #[test]
    fn zero_size_blocks_are_distinct() {
        let alloc = StackAlloc::new(64).unwrap();
        let a = alloc.allocate(0).unwrap();
        let b = alloc.allocate(0).unwrap();
        let c = alloc.allocate(8).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(alloc.used(), 40);
    }

    #[test]
    fn reset_rewinds() {
        let mut alloc = StackAlloc::new(64).unwrap();
        let a = alloc.allocate(64).unwrap();
        assert!(alloc.allocate(1).is_err());
        alloc.reset();
        let b = alloc.allocate(64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(StackAlloc::new(0), Err(ConfigError::ZeroCapacity)));
    }
}
