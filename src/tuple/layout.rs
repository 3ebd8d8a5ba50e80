//! Serializable snapshots of a tuple, for logging and debugging.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TupleState {
    Live,
    Freed,
}

/// Where each element of a tuple lives, without the bytes themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleLayout {
    pub state: TupleState,
    pub sizes: Vec<usize>,
    pub offsets: Vec<usize>,
    pub total_size: usize,
}

impl TupleLayout {
    /// Checks `offsets[0] == 0`, `offsets[i + 1] == offsets[i] + sizes[i]`
    /// and that the sizes add up to `total_size`.
    pub fn is_consistent(&self) -> bool {
        if self.sizes.len() != self.offsets.len() {
            return false;
        }
        let mut expected = 0usize;
        for (&size, &offset) in self.sizes.iter().zip(&self.offsets) {
            if offset != expected {
                return false;
            }
            match expected.checked_add(size) {
                Some(next) => expected = next,
                None => return false,
            }
        }
        expected == self.total_size
    }
}

/// Bytes that print as hex.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HexDump {
    buf: Vec<u8>,
}

impl HexDump {
    pub const fn new(buf: Vec<u8>) -> Self {
        Self { buf }
    }
}

impl fmt::Debug for HexDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, byte) in self.buf.iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_pads_bytes() {
        let dump = HexDump::new(vec![0x01, 0xc8, 0x00, 0xff]);
        assert_eq!(format!("{dump:?}"), "[01 c8 00 ff]");
        assert_eq!(format!("{:?}", HexDump::new(Vec::new())), "[]");
    }

    #[test]
    fn consistency_check_catches_gaps() {
        let mut layout = TupleLayout {
            state: TupleState::Live,
            sizes: vec![1, 2, 4],
            offsets: vec![0, 1, 3],
            total_size: 7,
        };
        assert!(layout.is_consistent());
        layout.offsets[2] = 4;
        assert!(!layout.is_consistent());
    }
}
