//! Part Slicing
//!
//! Picks one part size for a whole upload and cuts the payload into
//! contiguous slices of that size.
//!
//! The part size is a fixed numeric policy: the service checks that every
//! part of an upload (except the last) has exactly the size declared when
//! the upload was initiated, so the calculation must stay bit-for-bit stable.

use crate::config::UploadConfig;
use crate::range::ContentRange;
use crate::MIB;

// ============================================================================
// Constants
// ============================================================================

/// Default target ratio between part size and number of parts
pub const DEFAULT_PART_SIZE_RATIO: f64 = 0.32;

/// Smallest part size the service accepts: 1 MiB
pub const MIN_PART_SIZE_MIB: u64 = 1;

/// Largest part size the service accepts: 4 GiB
pub const MAX_PART_SIZE_MIB: u64 = 4096;

/// Slicing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlicingError {
    #[error("No slices left: {total} bytes already sliced into {parts} parts")]
    Exhausted { total: u64, parts: u32 },
}

// ============================================================================
// Calculator
// ============================================================================

/// Computes the part size for a payload and starts slicing sessions
///
/// Holds configuration only; every upload gets its own [`SlicingSession`].
#[derive(Debug, Clone)]
pub struct ChunkSizeCalculator {
    ratio: f64,
    max_part_size_mib: u64,
}

impl ChunkSizeCalculator {
    /// `max_part_size_mib` is clamped to `[1, 4096]` and rounded down to a
    /// power of two, so every computed part size is one the service accepts.
    pub fn new(ratio: f64, max_part_size_mib: u64) -> Self {
        let clamped = max_part_size_mib.clamp(MIN_PART_SIZE_MIB, MAX_PART_SIZE_MIB);
        let max = 1u64 << (63 - clamped.leading_zeros());

        if max != max_part_size_mib {
            tracing::warn!(
                requested = max_part_size_mib,
                max_part_size_mib = max,
                "Adjusted maximum part size"
            );
        }

        Self {
            ratio,
            max_part_size_mib: max,
        }
    }

    pub fn max_part_size_mib(&self) -> u64 {
        self.max_part_size_mib
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.part_size_ratio, config.max_part_size_mib)
    }

    /// Part size in MiB for a payload of `length` bytes
    pub fn part_size_mib(&self, length: u64) -> u64 {
        let length_mib = length / MIB + 1;
        let fp_part_size_mib = (self.ratio * length_mib as f64).sqrt();

        // Smallest power of two strictly greater than floor(fp) - 1.
        let floor = fp_part_size_mib.floor() as i64 - 1;
        let part_size_mib = if floor <= 0 {
            0
        } else {
            let highest_one_bit = 1u64 << (63 - floor.leading_zeros());
            highest_one_bit.checked_mul(2).unwrap_or(u64::MAX)
        };

        part_size_mib.clamp(MIN_PART_SIZE_MIB, self.max_part_size_mib)
    }

    /// Part size in bytes for a payload of `length` bytes
    pub fn part_size_bytes(&self, length: u64) -> u64 {
        self.part_size_mib(length) * MIB
    }

    /// Start a new slicing session over `payload`
    pub fn start_slicing<'a>(&self, payload: &'a [u8]) -> SlicingSession<'a> {
        let part_size_mib = self.part_size_mib(payload.len() as u64);

        tracing::debug!(
            length = payload.len(),
            part_size_mib = part_size_mib,
            "Computed part size"
        );

        SlicingSession {
            payload,
            part_size_bytes: part_size_mib * MIB,
            copied: 0,
            part_number: 0,
        }
    }
}

impl Default for ChunkSizeCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_PART_SIZE_RATIO, MAX_PART_SIZE_MIB)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One part of a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSlice<'a> {
    pub bytes: &'a [u8],
    pub range: ContentRange,
    pub part_number: u32,
}

/// Slicing progress over one payload
#[derive(Debug)]
pub struct SlicingSession<'a> {
    payload: &'a [u8],
    part_size_bytes: u64,
    copied: u64,
    part_number: u32,
}

impl<'a> SlicingSession<'a> {
    pub fn part_size_bytes(&self) -> u64 {
        self.part_size_bytes
    }

    pub fn total_len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn has_next(&self) -> bool {
        self.copied < self.total_len()
    }

    pub fn remaining(&self) -> u64 {
        self.total_len() - self.copied
    }

    /// Take the next slice and advance the session
    pub fn next_slice(&mut self) -> Result<PayloadSlice<'a>, SlicingError> {
        if !self.has_next() {
            return Err(SlicingError::Exhausted {
                total: self.total_len(),
                parts: self.part_number,
            });
        }

        let len = self.remaining().min(self.part_size_bytes);
        let start = self.copied as usize;
        let slice = PayloadSlice {
            bytes: &self.payload[start..start + len as usize],
            range: ContentRange::spanning(self.copied, len),
            part_number: self.part_number,
        };

        self.copied += len;
        self.part_number += 1;

        Ok(slice)
    }
}

impl<'a> Iterator for SlicingSession<'a> {
    type Item = PayloadSlice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_slice().ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
