//! Port range type with validation.
//!
//! A `PortRange` is always non-empty and ordered; the whole 0-65535 space is
//! accepted, including port 0.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (0-65535)")]
    OutOfRange(u32),
    #[error("start ({0}) > end ({1})")]
    InvalidRange(u32, u32),
}

/// An inclusive, contiguous range of TCP ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Build a range from raw bounds as a caller would submit them.
    ///
    /// Bounds are taken as `u32` so that out-of-range input is reported
    /// rather than silently truncated.
    pub fn new(start: u32, end: u32) -> Result<Self, PortError> {
        let start_port = u16::try_from(start).map_err(|_| PortError::OutOfRange(start))?;
        let end_port = u16::try_from(end).map_err(|_| PortError::OutOfRange(end))?;
        if start_port > end_port {
            return Err(PortError::InvalidRange(start, end));
        }
        Ok(Self {
            start: start_port,
            end: end_port,
        })
    }

    /// Number of ports in this range.
    pub const fn len(&self) -> u32 {
        (self.end - self.start) as u32 + 1
    }

    /// Always false; a valid range holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Port at `offset` from the start of the range.
    pub fn nth(&self, offset: u32) -> Option<u16> {
        if offset < self.len() {
            // offset < len <= 65536, so start + offset fits in u16
            Some((self.start as u32 + offset) as u16)
        } else {
            None
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
