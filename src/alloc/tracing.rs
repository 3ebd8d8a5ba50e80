//! A wrapper allocator that keeps a record of every live allocation.
//!
//! Every `allocate()` registers an [`AllocId`] and every `release()` removes
//! it again, so at any point you can ask how many blocks are outstanding, how
//! many bytes they hold, or which allocation an arbitrary pointer lands in.
//! This is how the tests prove that a tuple gives back everything it took.

use std::{
    cmp::Ordering as CmpOrdering,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use ahash::RandomState;
use hashbrown::HashMap;
use log::{trace, warn};
use serde::{Deserialize, Serialize};

use super::{AllocError, Allocator};
use crate::serialize::serde_usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct AllocId {
    /// Where is this allocation?
    #[serde(with = "serde_usize")]
    pub ptr: *const (),
    /// How big is it?
    pub size: usize,
}

impl AllocId {
    /// Tests if `ptr` is interior to this allocation. Zero-size allocations
    /// only contain their own address.
    pub fn test_interior_ptr(self, ptr: usize) -> CmpOrdering {
        let start = self.ptr as usize;
        let end = start + self.size.max(1);
        if ptr < start {
            CmpOrdering::Less
        } else if ptr >= end {
            CmpOrdering::Greater
        } else {
            CmpOrdering::Equal
        }
    }
}

/// Allocator that forwards to `A`, tracking every allocation it hands out.
pub struct TracingAlloc<A> {
    allocator: A,
    /// address -> size
    live: Mutex<HashMap<usize, usize, RandomState>>,
    nr_allocations: AtomicUsize,
}

impl<A> TracingAlloc<A>
where
    A: Allocator,
{
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            live: Mutex::new(HashMap::with_hasher(RandomState::new())),
            nr_allocations: AtomicUsize::new(0),
        }
    }

    fn live_map(&self) -> MutexGuard<'_, HashMap<usize, usize, RandomState>> {
        // The map is only touched by insert/remove, which can't leave it
        // inconsistent if some other holder panicked.
        match self.live.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of allocations that have not been released yet.
    pub fn nr_allocations(&self) -> usize {
        self.nr_allocations.load(Ordering::Acquire)
    }

    /// Total bytes held by live allocations.
    pub fn live_bytes(&self) -> usize {
        self.live_map().values().sum()
    }

    /// Every live allocation, sorted by address.
    pub fn live(&self) -> Vec<AllocId> {
        let mut ids: Vec<AllocId> = self
            .live_map()
            .iter()
            .map(|(&ptr, &size)| AllocId {
                ptr: ptr as *const (),
                size,
            })
            .collect();
        ids.sort_by_key(|id| id.ptr as usize);
        ids
    }

    /// Find the live allocation that `ptr` points into, if there is one.
    pub fn find<T>(&self, ptr: *const T) -> Option<AllocId> {
        let address = ptr as usize;
        self.live_map()
            .iter()
            .map(|(&start, &size)| AllocId {
                ptr: start as *const (),
                size,
            })
            .find(|id| id.test_interior_ptr(address) == CmpOrdering::Equal)
    }

    /// Return the underlying allocator
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }
}

// SAFETY: Every block comes straight from `A`, which upholds the contract.
unsafe impl<A> Allocator for TracingAlloc<A>
where
    A: Allocator,
{
    fn allocate(&self, size: isize) -> Result<NonNull<u8>, AllocError> {
        let data = self.allocator.allocate(size)?;
        trace!("allocate(size: {size}) -> {:p}", data.as_ptr());
        if let Some(prev) = self.live_map().insert(data.as_ptr() as usize, size as usize) {
            warn!(
                "allocate(size: {size}) returned {:p}, which is still live with size {prev}",
                data.as_ptr()
            );
        }
        self.nr_allocations.fetch_add(1, Ordering::Release);
        Ok(data)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: isize) {
        trace!("release({:p}, size: {size})", ptr.as_ptr());
        match self.live_map().remove(&(ptr.as_ptr() as usize)) {
            Some(recorded) => {
                if recorded != size as usize {
                    warn!(
                        "release({:p}) with size {size}, but it was allocated with size {recorded}",
                        ptr.as_ptr()
                    );
                }
                self.nr_allocations.fetch_sub(1, Ordering::Release);
            }
            None => warn!("release({:p}) of an unknown allocation", ptr.as_ptr()),
        }
        // SAFETY: Identical contract to caller.
        unsafe { self.allocator.release(ptr, size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::HeapAllocator;

    #[test]
    fn counts_live_allocations() {
        let alloc = TracingAlloc::new(HeapAllocator);
        let a = alloc.allocate(10).unwrap();
        let b = alloc.allocate(6).unwrap();
        assert_eq!(alloc.nr_allocations(), 2);
        assert_eq!(alloc.live_bytes(), 16);

        unsafe { alloc.release(a, 10) };
        assert_eq!(alloc.nr_allocations(), 1);
        assert_eq!(alloc.live_bytes(), 6);

        unsafe { alloc.release(b, 6) };
        assert_eq!(alloc.nr_allocations(), 0);
        assert!(alloc.live().is_empty());
    }

    #[test]
    fn finds_interior_pointers() {
        let alloc = TracingAlloc::new(HeapAllocator);
        let a = alloc.allocate(16).unwrap();
        let inside = unsafe { a.as_ptr().add(15) };
        let id = alloc.find(inside).unwrap();
        assert_eq!(id.ptr as usize, a.as_ptr() as usize);
        assert_eq!(id.size, 16);
        unsafe { alloc.release(a, 16) };
        assert_eq!(alloc.find(inside), None);
    }

    #[test]
    fn test_interior_ptr_orders_around_the_block() {
        let id = AllocId {
            ptr: 100 as *const (),
            size: 8,
        };
        assert_eq!(id.test_interior_ptr(99), CmpOrdering::Less);
        assert_eq!(id.test_interior_ptr(100), CmpOrdering::Equal);
        assert_eq!(id.test_interior_ptr(107), CmpOrdering::Equal);
        assert_eq!(id.test_interior_ptr(108), CmpOrdering::Greater);
    }

    #[test]
    fn alloc_id_serializes_address_as_integer() {
        let id = AllocId {
            ptr: 4096 as *const (),
            size: 3,
        };
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"ptr":4096,"size":3}"#);
        let back: AllocId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
