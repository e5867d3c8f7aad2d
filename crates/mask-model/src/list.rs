//! Mask Lists
//!
//! Masks are 1 to 4 byte little-endian symbols read from a byte buffer.
//! With `overlap` a mask starts at every byte; without it masks tile the
//! buffer in whole blocks and any trailing partial block is ignored.

use serde::{Deserialize, Serialize};

use crate::MaskError;

/// Largest supported granularity (4-byte masks)
pub const MAX_GRANULARITY: u8 = 3;

/// Result of counting the masks in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskCount {
    /// Number of complete masks
    pub count: usize,
    /// Whether trailing bytes did not fill a whole mask
    pub ignored_tail: bool,
}

/// Validates a granularity and returns the mask size in bytes.
pub fn mask_size(granularity: u8) -> Result<usize, MaskError> {
    if granularity > MAX_GRANULARITY {
        return Err(MaskError::InvalidGranularity(granularity));
    }
    Ok(granularity as usize + 1)
}

/// Largest mask value a granularity can express.
pub fn full_mask_max(granularity: u8) -> Result<u32, MaskError> {
    let size = mask_size(granularity)?;
    Ok((u64::MAX >> (64 - 8 * size)) as u32)
}

/// Counts the masks in `byte_len` bytes.
pub fn mask_count(granularity: u8, byte_len: usize, overlap: bool) -> Result<MaskCount, MaskError> {
    let size = mask_size(granularity)?;
    let too_small = MaskError::TooSmall {
        len: byte_len,
        mask_size: size,
    };
    if byte_len < size {
        return Err(too_small);
    }
    if overlap {
        Ok(MaskCount {
            count: byte_len - size + 1,
            ignored_tail: false,
        })
    } else {
        Ok(MaskCount {
            count: byte_len / size,
            ignored_tail: byte_len % size != 0,
        })
    }
}

/// Ordered masks extracted from a buffer. Storage is reused across loads and
/// grows only through fallible reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskList {
    masks: Vec<u32>,
}

impl MaskList {
    /// Create an empty list with room for `capacity` masks.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, MaskError> {
        let mut list = Self::default();
        list.reserve(capacity)?;
        Ok(list)
    }

    /// Wraps existing mask values.
    pub fn from_masks(masks: Vec<u32>) -> Self {
        Self { masks }
    }

    /// Ensures room for `capacity` masks in total.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), MaskError> {
        let additional = capacity.saturating_sub(self.masks.len());
        self.masks
            .try_reserve_exact(additional)
            .map_err(|_| MaskError::AllocationFailed {
                what: "mask list",
                len: capacity,
            })
    }

    /// Replaces the contents with the masks of `bytes`.
    pub fn load(&mut self, bytes: &[u8], granularity: u8, overlap: bool) -> Result<MaskCount, MaskError> {
        let counted = mask_count(granularity, bytes.len(), overlap)?;
        let size = granularity as usize + 1;
        let stride = if overlap { 1 } else { size };

        self.masks.clear();
        self.reserve(counted.count)?;
        self.masks.extend((0..counted.count).map(|i| {
            let start = i * stride;
            bytes[start..start + size]
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32)
        }));
        Ok(counted)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.masks.capacity()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.masks
    }

    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.masks
    }

    /// Largest mask, or `None` when empty
    /// Checks every mask against a ceiling.
    pub fn check_max(&self, mask_max: u32) -> Result<(), MaskError> {
        match self.masks.iter().position(|&m| m > mask_max) {
            Some(index) => Err(MaskError::MaskOutOfRange {
                mask: self.masks[index],
                index,
                mask_max,
            }),
            None => Ok(()),
        }
    }
}
