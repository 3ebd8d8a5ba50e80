//! An allocator made of two function pointers and a context pointer, the
//! shape C libraries use for custom allocators. Lets foreign allocators plug
//! in without a wrapper type of their own.

use std::{ffi::c_void, ptr::NonNull};

use super::{checked_size, AllocError, Allocator};
use crate::util::hint::cold;

pub type MallocFn = unsafe extern "C" fn(size: isize, ctx: *mut c_void) -> *mut c_void;
pub type FreeFn = unsafe extern "C" fn(data: *mut c_void, size: isize, ctx: *mut c_void);

#[derive(Clone, Copy, Debug)]
pub struct FnAllocator {
    malloc: MallocFn,
    free: FreeFn,
    context: *mut c_void,
}

impl FnAllocator {
    /// # Safety
    ///
    /// - `malloc` must behave as [`Allocator::allocate()`] requires: a non-null
    ///   return is valid for `size` bytes, aligned to at least
    ///   [`MIN_ALIGN`](super::MIN_ALIGN), and non-null for `size == 0`
    /// - `free` must accept anything `malloc` returned, with the same size
    /// - `context` must stay valid for as long as this allocator is used, and
    ///   both functions must tolerate being called from whichever thread uses
    ///   the allocator
    pub const unsafe fn new(malloc: MallocFn, free: FreeFn, context: *mut c_void) -> Self {
        Self {
            malloc,
            free,
            context,
        }
    }
}

// SAFETY: Passed on to the caller of `FnAllocator::new()`.
unsafe impl Allocator for FnAllocator {
    fn allocate(&self, size: isize) -> Result<NonNull<u8>, AllocError> {
        checked_size(size)?;
        // SAFETY: `FnAllocator::new()` requires `malloc` to be callable with
        //         any non-negative size and our context.
        let data = unsafe { (self.malloc)(size, self.context) } as *mut u8;
        match NonNull::new(data) {
            Some(data) => Ok(data),
            None => cold(|| Err(AllocError::OutOfMemory { size })),
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: isize) {
        // SAFETY: Caller passes back a block from `allocate()`, which came
        //         from `malloc`.
        unsafe { (self.free)(ptr.as_ptr() as _, size, self.context) }
    }
}
