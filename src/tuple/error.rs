use std::fmt;

use crate::alloc::AllocError;

/// Everything that can go wrong building or reading a [`Tuple`](super::Tuple).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TupleError {
    /// One of the three allocations failed. Nothing was leaked: whatever had
    /// already been allocated was released again.
    Alloc(AllocError),
    /// The total payload (or the index arrays) would not fit in an `isize`.
    SizeOverflow,
    IndexOutOfRange { index: usize, len: usize },
    /// A typed read asked for a type whose size differs from the element's.
    SizeMismatch {
        index: usize,
        type_name: String,
        expected: usize,
        actual: usize,
    },
    /// The tuple has already been destroyed.
    Destroyed,
}

impl fmt::Display for TupleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "tuple allocation failed: {e}"),
            Self::SizeOverflow => write!(f, "tuple size overflows isize"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for tuple of {len} elements")
            }
            Self::SizeMismatch {
                index,
                type_name,
                expected,
                actual,
            } => write!(
                f,
                "element {index} is {actual} bytes, but `{type_name}` is {expected} bytes"
            ),
            Self::Destroyed => write!(f, "tuple has been destroyed"),
        }
    }
}

impl std::error::Error for TupleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for TupleError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}
