//! Ever wanted to put generic data next to each other in one big blob of
//! bytes? This does that.
//!
//! A [`Tuple`] is essentially a refactored array of [`SizedView`]s, with the
//! data squashed together and the indexing info kept outside:
//!
//! ```plaintext
//!            +---+---+---+
//! sizes      | 1 | 2 | 4 |
//!            +---+---+---+
//! offsets    | 0 | 1 | 3 |
//!            +---+---+---+
//!              |   |   '-----------.
//!              v   v               v
//!            +---+-------+---------------+
//! data       | a |   b   |       c       |  (sum(sizes) bytes)
//!            +---+-------+---------------+
//! ```
//!
//! Those are three independent allocations, all from the same allocator, and
//! all released together by [`Tuple::destroy()`] (or on drop). The bytes are
//! copies: the views a tuple was built from can be freed or changed as soon as
//! `build` returns.

use std::{fmt, mem, ptr::NonNull};

use bytemuck::Pod;
use log::debug;

use crate::{
    alloc::{or_default, raw::Block, Allocator, HeapAllocator, HEAP},
    sized::SizedView,
    util::num::checked_sum,
};

mod error;
mod layout;

pub use error::TupleError;
pub use layout::{HexDump, TupleLayout, TupleState};

/// Fixed-arity, ordered, independently sized byte payloads packed into one
/// contiguous allocation (Python's tuples if they weren't const).
///
/// The tuple remembers the allocator it was built with, so it is always
/// released through the same one.
pub struct Tuple<'a, A = dyn Allocator + 'a>
where
    A: Allocator + ?Sized,
{
    alloc: &'a A,
    len: usize,
    sizes: Option<Block>,
    offsets: Option<Block>,
    data: Option<Block>,
}

// SAFETY: The blocks are owned exclusively by the tuple and only read through
//         `&self`; the only shared thing is `&A`, which needs `A: Sync` to
//         cross threads.
unsafe impl<A> Send for Tuple<'_, A> where A: Allocator + Sync + ?Sized {}
// SAFETY: As above. Nothing behind `&Tuple` is ever mutated.
unsafe impl<A> Sync for Tuple<'_, A> where A: Allocator + Sync + ?Sized {}

impl Tuple<'static, HeapAllocator> {
    /// Build a tuple on the default allocator ([`HEAP`]).
    pub fn build(views: &[SizedView<'_>]) -> Result<Self, TupleError> {
        Tuple::build_with(&HEAP, views)
    }
}

impl<'a> Tuple<'a> {
    /// Build a tuple with `alloc`, or with [`HEAP`] if `alloc` is `None`.
    pub fn build_in(
        alloc: Option<&'a dyn Allocator>,
        views: &[SizedView<'_>],
    ) -> Result<Self, TupleError> {
        Tuple::build_with(or_default(alloc), views)
    }
}

impl<'a, A> Tuple<'a, A>
where
    A: Allocator + ?Sized,
{
    /// Copy every view, in order, into one new contiguous buffer.
    ///
    /// Sizes are gathered first so that the buffer can be allocated once,
    /// at its final size. If any allocation fails, everything allocated so
    /// far is released again before the error is returned.
    pub fn build_with(alloc: &'a A, views: &[SizedView<'_>]) -> Result<Self, TupleError> {
        let len = views.len();
        let index_size = len
            .checked_mul(mem::size_of::<usize>())
            .and_then(|size| isize::try_from(size).ok())
            .ok_or(TupleError::SizeOverflow)?;
        let total = checked_sum(views.iter().map(SizedView::len))
            .filter(|&total| isize::try_from(total).is_ok())
            .ok_or(TupleError::SizeOverflow)?;

        // Any early return from here on drops `tuple`, which releases
        // whichever blocks have been allocated.
        let mut tuple = Self {
            alloc,
            len,
            sizes: None,
            offsets: None,
            data: None,
        };

        let sizes = tuple
            .sizes
            .insert(Block::allocate(alloc, index_size)?)
            .as_words_mut();
        let offsets = tuple
            .offsets
            .insert(Block::allocate(alloc, index_size)?)
            .as_words_mut();

        // no overflow: every prefix is bounded by `total`
        let mut offset = 0;
        for ((view, size), slot) in views.iter().zip(sizes.iter_mut()).zip(offsets.iter_mut()) {
            *slot = offset;
            *size = view.len();
            offset += view.len();
        }

        let data = tuple
            .data
            .insert(Block::allocate(alloc, total as isize)?)
            .as_bytes_mut();
        for (view, &offset) in views.iter().zip(offsets.iter()) {
            data[offset..offset + view.len()].copy_from_slice(view.as_slice());
        }

        debug!("built tuple of {len} elements, {total} bytes");
        Ok(tuple)
    }

    /// Release the data buffer, then the offsets, then the sizes, and leave
    /// the tuple empty. Calling this again does nothing.
    pub fn destroy(&mut self) {
        let live = self.data.is_some();
        // SAFETY: Every block was allocated by `self.alloc`, and `take()`
        //         makes sure each one is released at most once.
        unsafe {
            if let Some(data) = self.data.take() {
                data.release(self.alloc);
            }
            if let Some(offsets) = self.offsets.take() {
                offsets.release(self.alloc);
            }
            if let Some(sizes) = self.sizes.take() {
                sizes.release(self.alloc);
            }
        }
        if live {
            debug!("destroyed tuple of {} elements", self.len);
        }
    }

    pub fn state(&self) -> TupleState {
        if self.data.is_some() {
            TupleState::Live
        } else {
            TupleState::Freed
        }
    }

    /// Number of elements. Fixed at construction.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of every element; empty once destroyed.
    pub fn sizes(&self) -> &[usize] {
        self.sizes.as_ref().map_or(&[] as &[usize], Block::as_words)
    }

    /// Offset of every element into [`data()`](Self::data); empty once
    /// destroyed.
    pub fn offsets(&self) -> &[usize] {
        self.offsets.as_ref().map_or(&[] as &[usize], Block::as_words)
    }

    /// The backing buffer, `None` once destroyed.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_ref().map(Block::as_bytes)
    }

    pub fn total_size(&self) -> usize {
        self.data.as_ref().map_or(0, Block::size)
    }

    fn check(&self, index: usize) -> Result<(), TupleError> {
        if self.data.is_none() {
            return Err(TupleError::Destroyed);
        }
        if index >= self.len {
            return Err(TupleError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    /// Pointer to the first byte of element `index`.
    pub fn get(&self, index: usize) -> Result<NonNull<u8>, TupleError> {
        self.check(index)?;
        // SAFETY: The tuple is live and `index` is in bounds.
        Ok(unsafe { self.get_unchecked(index) })
    }

    /// [`get()`](Self::get) without any checks.
    ///
    /// # Safety
    ///
    /// The tuple must not be destroyed, and `index` must be less than
    /// [`len()`](Self::len).
    pub unsafe fn get_unchecked(&self, index: usize) -> NonNull<u8> {
        // SAFETY: Caller guarantees the tuple is live, so both blocks exist,
        //         and that `index` is in bounds. `offsets[index] <= sum(sizes)`,
        //         so the result is within (or one past) the data block.
        unsafe {
            let data = self.data.as_ref().unwrap_unchecked();
            let offset = *self
                .offsets
                .as_ref()
                .unwrap_unchecked()
                .as_words()
                .get_unchecked(index);
            NonNull::new_unchecked(data.as_ptr().add(offset))
        }
    }

    /// The bytes of element `index`.
    pub fn get_bytes(&self, index: usize) -> Result<&[u8], TupleError> {
        self.check(index)?;
        let offset = self.offsets()[index];
        let size = self.sizes()[index];
        Ok(&self.data().unwrap_or_default()[offset..offset + size])
    }

    /// Like [`get()`](Self::get), but also says how big the element is, so it
    /// can be passed on without tracking its length separately.
    pub fn get_sized(&self, index: usize) -> Result<SizedView<'_>, TupleError> {
        self.get_bytes(index).map(SizedView::from_slice)
    }

    /// Read element `index` as a `T`. The element must be exactly
    /// `size_of::<T>()` bytes; it does not need to be aligned.
    pub fn read<T: Pod>(&self, index: usize) -> Result<T, TupleError> {
        let bytes = self.get_bytes(index)?;
        if bytes.len() != mem::size_of::<T>() {
            return Err(TupleError::SizeMismatch {
                index,
                type_name: tynm::type_name::<T>(),
                expected: mem::size_of::<T>(),
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Every element, in order. Yields nothing once destroyed.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = SizedView<'_>> + '_ {
        let data = self.data().unwrap_or_default();
        self.offsets()
            .iter()
            .zip(self.sizes())
            .map(move |(&offset, &size)| SizedView::from_slice(&data[offset..offset + size]))
    }

    pub fn layout(&self) -> TupleLayout {
        TupleLayout {
            state: self.state(),
            sizes: self.sizes().to_vec(),
            offsets: self.offsets().to_vec(),
            total_size: self.total_size(),
        }
    }

    pub fn hex_dump(&self) -> HexDump {
        HexDump::new(self.data().unwrap_or_default().to_vec())
    }
}

impl<A> Drop for Tuple<'_, A>
where
    A: Allocator + ?Sized,
{
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<A> fmt::Debug for Tuple<'_, A>
where
    A: Allocator + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuple")
            .field("state", &self.state())
            .field("sizes", &self.sizes())
            .field("offsets", &self.offsets())
            .field("data", &self.hex_dump())
            .finish()
    }
}

/// Build a [`Tuple`] from plain values, copying each value's bytes.
///
/// ```
/// let tup = citeron::tuple!(1i8, 200i16, 1234i32).unwrap();
/// assert_eq!(tup.sizes(), &[1, 2, 4]);
///
/// let heap = citeron::alloc::HeapAllocator;
/// let tup = citeron::tuple!(in Some(&heap); 7u64).unwrap();
/// assert_eq!(tup.read::<u64>(0).unwrap(), 7);
/// ```
#[macro_export]
macro_rules! tuple {
    (in $alloc:expr; $($value:expr),* $(,)?) => {
        $crate::tuple::Tuple::build_in(
            $alloc,
            &[$($crate::sized::SizedView::of(&$value)),*],
        )
    };
    ($($value:expr),* $(,)?) => {
        $crate::tuple::Tuple::build(&[$($crate::sized::SizedView::of(&$value)),*])
    };
}
