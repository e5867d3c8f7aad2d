//! Math Caches
//!
//! Numeric services consumed by the sweep engine:
//! - `LogCache`: direct-mapped memo of `ln(n)` and `ln(n) - ln(n-1)`
//! - `LogGammaCache`: immutable `ln Γ(n)` table with a Stirling fallback
//! - `PopulationCache`: frequency-of-frequencies histogram for logfreedom

mod alloc;
mod error;
mod log_cache;
mod log_gamma;
mod population;
pub mod scale;

pub use error::CacheError;
pub use log_cache::{CacheStats, LogCache, MAX_BITS, MIN_BITS};
pub use log_gamma::{LogGammaCache, DEFAULT_TABLE_LEN, STIRLING_MIN};
pub use population::PopulationCache;
