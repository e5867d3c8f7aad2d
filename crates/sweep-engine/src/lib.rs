//! Sweep Engine
//!
//! Scores every sliding window ("sweep") of a mask list in one pass:
//! - Single-distribution metrics: agnentropy, logfreedom, Shannon entropy,
//!   obtuse variance and kurtosis, plus their [0, 1] normalisations
//! - Divergence against a preloaded needle: diventropy, Jensen-Shannon and
//!   Leidich divergence, and exo-entropy against the sweep's complement
//! - Top-K ranking or a full unranked dump of the per-sweep scores
//!
//! Each sweep after the first is updated from the two masks that changed
//! membership, so a whole buffer costs amortized constant time per offset.

pub mod config;
mod context;
pub mod convert;
mod divergence;
mod entropy;
mod logs;
pub mod mode;
mod result;
mod sweep;

pub use config::{EngineConfig, API_VERSION};
pub use context::{Context, MaskMaxOverride};
pub use convert::{compressivity, divcompressivity, dyspoissonism, shannonism, Normalizer};
pub use mode::{Capability, Mode, ModeKind, ModeSet};
pub use result::{TransformRequest, TransformResult};

pub use fracterval::Fru128;
pub use rank_list::RankOrder;

use mask_model::MaskError;
use math_cache::CacheError;
use rank_list::RankError;
use thiserror::Error;

/// Engine error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error("Mode set is empty")]
    EmptyModeSet,

    #[error("Kurtosis and variance need mask_max + 1 to be a power of two, got mask_max {0:#X}")]
    MaskMaxNotPow2Minus1(u32),

    #[error("Sweep index limit {sweep} exceeds mask index limit {masks}")]
    SweepLimitExceedsMaskLimit { sweep: u64, masks: u64 },

    #[error("Mask index limit {0} exceeds the frequency counter range")]
    MaskIdxMaxTooLarge(u64),

    #[error("API version {required} required, {available} available")]
    ApiVersion { required: u32, available: u32 },

    #[error("Failed to allocate {len} entries for {what}")]
    AllocationFailed { what: &'static str, len: usize },

    #[error("Mask max override is refused while kurtosis or variance is enabled")]
    OverrideWithMoments,

    #[error("Mask max override {requested:#X} exceeds allocated {allocated:#X}")]
    OverrideTooLarge { requested: u32, allocated: u32 },

    #[error("Mode {0} is not enabled in this context")]
    ModeNotEnabled(Mode),

    #[error("Mode {mode} is not a {expected} mode")]
    ModeKind { mode: Mode, expected: ModeKind },

    #[error("No enabled mode uses a needle")]
    NeedleUnused,

    #[error("Mode {0} needs a needle loaded first")]
    NeedleMissing(Mode),

    #[error("Sweep length must be nonzero")]
    SweepEmpty,

    #[error("Sweep of {sweep} masks exceeds list of {masks}")]
    SweepTooLong { sweep: u64, masks: u64 },

    #[error("Sweep of {sweep} masks exceeds the configured limit {max}")]
    SweepLimit { sweep: u64, max: u64 },

    #[error("List of {len} masks exceeds the configured limit {max}")]
    ListTooLong { len: u64, max: u64 },

    #[error("Needle and sweep mask counts are too large for {0}")]
    ProductTooLarge(Mode),
}
