//! Configuration for the fixed-capacity arena allocator.

use std::{fmt, io};

use serde::Deserialize;

use crate::{alloc::MIN_ALIGN, util::assert::valid_align};

/// Sizing for a [`StackAlloc`](crate::os::mem::StackAlloc) arena.
///
/// Can be read from JSON; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaConfig {
    /// Bytes available to the arena. The mapping is rounded up to whole pages,
    /// but only `capacity` bytes are ever handed out.
    pub capacity: usize,
    /// Alignment of every block. Must be a power of two no smaller than
    /// [`MIN_ALIGN`].
    pub align: usize,
}

impl ArenaConfig {
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;
    pub const DEFAULT_ALIGN: usize = 16;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !valid_align(self.align) || self.align < MIN_ALIGN {
            return Err(ConfigError::BadAlign { align: self.align });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            align: Self::DEFAULT_ALIGN,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ZeroCapacity,
    BadAlign { align: usize },
    Parse(serde_json::Error),
    /// The operating system refused to map the arena.
    Map(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "arena capacity must be non-zero"),
            Self::BadAlign { align } => write!(
                f,
                "arena alignment {align} must be a power of two of at least {MIN_ALIGN}"
            ),
            Self::Parse(e) => write!(f, "invalid arena config: {e}"),
            Self::Map(e) => write!(f, "could not map arena: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Map(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 64 * 1024);
    }

    #[test]
    fn json_fills_in_missing_fields() {
        let config = ArenaConfig::from_json(r#"{ "capacity": 128 }"#).unwrap();
        assert_eq!(config, ArenaConfig::new(128));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ArenaConfig::from_json(r#"{ "capacity": 0 }"#),
            Err(ConfigError::ZeroCapacity)
        ));
        assert!(matches!(
            ArenaConfig::from_json(r#"{ "align": 24 }"#),
            Err(ConfigError::BadAlign { align: 24 })
        ));
        assert!(matches!(
            ArenaConfig::from_json(r#"{ "capcity": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
