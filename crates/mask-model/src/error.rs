//! Mask Error Types

use thiserror::Error;

/// Errors from mask extraction and preprocessing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    /// Granularity outside 0..=3
    #[error("Invalid granularity {0}, expected 0 to 3")]
    InvalidGranularity(u8),

    /// Buffer holds no complete mask
    #[error("{len} bytes is too small for a mask of {mask_size} bytes")]
    TooSmall { len: usize, mask_size: usize },

    /// Mask ceiling exceeds what the granularity can express
    #[error("mask_max {mask_max:#X} exceeds {limit:#X} for granularity {granularity}")]
    MaskMaxTooLarge {
        mask_max: u32,
        limit: u32,
        granularity: u8,
    },

    /// Mask value above the declared ceiling
    #[error("Mask {mask:#X} at index {index} exceeds mask_max {mask_max:#X}")]
    MaskOutOfRange { mask: u32, index: usize, mask_max: u32 },

    /// Channelized deltas need every byte lane present
    #[error("Channelized deltas need the full-width mask_max {expected:#X}, got {mask_max:#X}")]
    ChannelizeNeedsFullWidth { mask_max: u32, expected: u32 },

    /// Too many delta passes
    #[error("Delta count {0} exceeds the maximum of 3")]
    DeltaCount(u8),

    /// Signed interpretation needs a power-of-two mask span
    #[error("Sign detection needs mask_max + 1 to be a power of two, got mask_max {0:#X}")]
    SpanNotPowerOfTwo(u32),

    /// Table subtraction would go negative
    #[error("Table subtraction underflows at mask {mask:#X}")]
    TableUnderflow { mask: u32 },

    /// Operation needs at least one mask
    #[error("Mask list is empty")]
    EmptyList,

    /// Storage could not be reserved
    #[error("Failed to allocate {len} entries for {what}")]
    AllocationFailed { what: &'static str, len: usize },
}
