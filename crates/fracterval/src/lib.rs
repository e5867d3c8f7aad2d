//! Fracterval Arithmetic
//!
//! Sound fixed-point interval numbers for entropy accumulation:
//! - `Fru64` and `Fru128` fractions with overflow reported through a flag
//! - `Reciprocal` for multiplying instead of dividing in hot loops
//! - exact `ln` and log-delta of integers with bounded error

mod common;
pub mod constants;
mod fru128;
mod fru64;
pub mod log;
mod reciprocal;
mod wide;

pub use constants::{HALF_LN_2PI, LN2};
pub use fru128::Fru128;
pub use fru64::Fru64;
pub use log::{log_delta_u64, log_u64};
pub use reciprocal::Reciprocal;
