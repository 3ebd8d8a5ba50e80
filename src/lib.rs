//! Pluggable allocators, and a tuple layout that packs a fixed number of
//! variable-length byte payloads into one contiguous allocation.
//!
//! ```
//! use citeron::{sized::SizedView, tuple::Tuple};
//!
//! let tup = Tuple::build(&[SizedView::of(&1i8), SizedView::of(&200i16)]).unwrap();
//! assert_eq!(tup.offsets(), &[0, 1]);
//! assert_eq!(tup.read::<i16>(1).unwrap(), 200);
//! ```

pub mod alloc;
pub mod config;
pub mod logging;
#[cfg(unix)]
pub mod os;
pub mod serialize;
pub mod sized;
pub mod tuple;
pub mod util;
