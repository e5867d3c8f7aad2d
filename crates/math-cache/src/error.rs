//! Cache Error Types

use thiserror::Error;

/// Errors while building a math cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Log cache size outside the supported range
    #[error("Log cache bits {bits} outside [{min}, {max}]")]
    InvalidBits { bits: u32, min: u32, max: u32 },

    /// Log-gamma table too short for Stirling's series to take over
    #[error("Log-gamma table length {len} is below the minimum of {min}")]
    TableTooShort { len: u64, min: u64 },

    /// Storage could not be reserved
    #[error("Failed to allocate {len} entries for {what}")]
    AllocationFailed { what: &'static str, len: usize },
}
