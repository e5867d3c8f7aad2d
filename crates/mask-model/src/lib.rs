//! Mask Model
//!
//! Symbol extraction and preprocessing ahead of the sweep engine:
//! - Mask counting and little-endian extraction into reusable lists
//! - Frequency tables with accrue, unaccrue and table subtraction
//! - Invertible transforms: deltafy, densify and surroundify
//! - Global mean and sign detection for kurtosis and variance

mod delta;
mod density;
mod error;
mod freq;
mod list;
mod mean;
mod surround;

pub use delta::{deltafy, deltafy_n, Direction, MAX_DELTA_COUNT};
pub use density::{DensityMap, UsedBitmap};
pub use error::MaskError;
pub use freq::FreqTable;
pub use list::{full_mask_max, mask_count, mask_size, MaskCount, MaskList, MAX_GRANULARITY};
pub use mean::{mean_get, MaskMean};
pub use surround::{surroundify, unsurroundify, SurroundRange};
