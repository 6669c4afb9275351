//! Content Ranges
//!
//! Inclusive byte ranges used to address the parts of a multipart upload.
//! The wire form is the `Content-Range` header value `bytes {from}-{to}/*`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MIB;

/// Range parsing and construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Malformed range {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

impl RangeError {
    fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// An inclusive byte range `[from, to]`
///
/// Ordered and compared by `(from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentRange {
    from: u64,
    to: u64,
}

impl ContentRange {
    /// Build a range from raw offsets. Requires `from < to`.
    pub fn build(from: u64, to: u64) -> Result<Self, RangeError> {
        if from >= to {
            return Err(RangeError::malformed(
                format!("{}-{}", from, to),
                "range end must be greater than range start",
            ));
        }
        Ok(Self { from, to })
    }

    /// Build the range covered by part `part_index` when every part is
    /// `part_size_mib` MiB long.
    pub fn from_part_number(part_index: u64, part_size_mib: u64) -> Result<Self, RangeError> {
        if part_size_mib == 0 {
            return Err(RangeError::malformed(
                format!("part {} of 0 MiB", part_index),
                "part size must be positive",
            ));
        }

        let overflow = || {
            RangeError::malformed(
                format!("part {} of {} MiB", part_index, part_size_mib),
                "range exceeds u64",
            )
        };
        let part_size_bytes = part_size_mib.checked_mul(MIB).ok_or_else(overflow)?;
        let from = part_index.checked_mul(part_size_bytes).ok_or_else(overflow)?;
        let to = from
            .checked_add(part_size_bytes - 1)
            .ok_or_else(overflow)?;

        Self::build(from, to)
    }

    /// Range of `len` bytes starting at `offset`.
    ///
    /// Slices of a payload may be a single byte long (a one-byte archive, or
    /// a one-byte tail), which `build` rejects; only the slicer uses this.
    pub(crate) fn spanning(offset: u64, len: u64) -> Self {
        debug_assert!(len > 0);
        Self {
            from: offset,
            to: offset + len - 1,
        }
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn to(&self) -> u64 {
        self.to
    }

    /// Number of bytes covered (both ends inclusive)
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// Header value for the `Content-Range` of a part upload
    pub fn to_header_string(&self) -> String {
        format!("bytes {}-{}/*", self.from, self.to)
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for ContentRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('-')
            .ok_or_else(|| RangeError::malformed(s, "expected <from>-<to>"))?;

        let parse = |half: &str, name: &str| {
            if half.is_empty() || !half.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RangeError::malformed(
                    s,
                    format!("{} must be a non-negative integer", name),
                ));
            }
            half.parse::<u64>()
                .map_err(|e| RangeError::malformed(s, format!("{}: {}", name, e)))
        };

        Self::build(parse(from, "start")?, parse(to, "end")?)
    }
}

// ============================================================================
// Tests
// ============================================================================
