//! Engine configuration

use mask_model::{full_mask_max, MaskError};
use math_cache::{CacheError, DEFAULT_TABLE_LEN, MAX_BITS, MIN_BITS, STIRLING_MIN};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Mode, ModeSet};

/// Engine API revision. Callers pin a minimum through
/// `EngineConfig::min_api_version`.
pub const API_VERSION: u32 = 1;

/// Context configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mask size in bytes minus one (0 to 3)
    pub granularity: u8,

    /// Masks start at every byte rather than every mask-sized block
    pub overlap: bool,

    /// Largest mask value; tables are allocated to this size
    pub mask_max: u32,

    /// Largest mask list index any transform will see
    pub mask_idx_max: u64,

    /// Largest sweep index, so sweeps hold at most `sweep_mask_idx_max + 1`
    /// masks
    pub sweep_mask_idx_max: u64,

    /// Modes this context can run
    pub modes: ModeSet,

    /// Cap on the log cache size as a power of two. The enabled modes
    /// suggest a size; this only ever lowers it.
    pub log_cache_bits: Option<u32>,

    /// Tabulated log-gamma arguments before Stirling's series takes over
    pub log_gamma_table_len: u64,

    /// Oldest engine API the caller accepts
    pub min_api_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            granularity: 0,
            overlap: false,
            mask_max: 0xFF,
            mask_idx_max: (1 << 24) - 1,
            sweep_mask_idx_max: (1 << 20) - 1,
            modes: ModeSet::single(Mode::Shannon),
            log_cache_bits: None,
            log_gamma_table_len: DEFAULT_TABLE_LEN,
            min_api_version: API_VERSION,
        }
    }
}

impl EngineConfig {
    /// Byte masks over the full 0..=255 span
    pub fn bytes(modes: ModeSet) -> Self {
        Self {
            modes,
            ..Default::default()
        }
    }

    /// Full-width masks of `granularity + 1` bytes
    pub fn for_granularity(granularity: u8, modes: ModeSet) -> Result<Self, EngineError> {
        Ok(Self {
            granularity,
            mask_max: full_mask_max(granularity)?,
            modes,
            ..Default::default()
        })
    }

    /// Checks every construction-time constraint.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_api_version > API_VERSION {
            return Err(EngineError::ApiVersion {
                required: self.min_api_version,
                available: API_VERSION,
            });
        }
        if self.modes.is_empty() {
            return Err(EngineError::EmptyModeSet);
        }

        let limit = full_mask_max(self.granularity)?;
        if self.mask_max > limit {
            return Err(MaskError::MaskMaxTooLarge {
                mask_max: self.mask_max,
                limit,
                granularity: self.granularity,
            }
            .into());
        }
        if self.modes.has_moments() && !(self.mask_max as u64 + 1).is_power_of_two() {
            return Err(EngineError::MaskMaxNotPow2Minus1(self.mask_max));
        }

        // frequencies and complement counts are u32
        if self.mask_idx_max >= u32::MAX as u64 {
            return Err(EngineError::MaskIdxMaxTooLarge(self.mask_idx_max));
        }
        if self.sweep_mask_idx_max > self.mask_idx_max {
            return Err(EngineError::SweepLimitExceedsMaskLimit {
                sweep: self.sweep_mask_idx_max,
                masks: self.mask_idx_max,
            });
        }

        if let Some(bits) = self.log_cache_bits {
            if !(MIN_BITS..=MAX_BITS).contains(&bits) {
                return Err(CacheError::InvalidBits {
                    bits,
                    min: MIN_BITS,
                    max: MAX_BITS,
                }
                .into());
            }
        }
        if self.log_gamma_table_len < STIRLING_MIN {
            return Err(CacheError::TableTooShort {
                len: self.log_gamma_table_len,
                min: STIRLING_MIN,
            }
            .into());
        }
        Ok(())
    }

    /// Mask list length limit
    pub fn max_masks(&self) -> u64 {
        self.mask_idx_max + 1
    }

    /// Sweep length limit
    pub fn max_sweep(&self) -> u64 {
        self.sweep_mask_idx_max + 1
    }
}
