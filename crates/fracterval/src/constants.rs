//! Transcendental constants, truncated to 128 fraction bits.

use crate::fru128::Fru128;

/// `ln 2`.
pub const LN2: Fru128 = Fru128::fractoid(0xb172_17f7_d1cf_79ab_c9e3_b398_03f2_f6af);

/// `ln(2 pi) / 2`, the constant term of Stirling's series.
pub const HALF_LN_2PI: Fru128 = Fru128::fractoid(0xeb3f_8e43_25f5_a534_94bc_9001_4419_2023);
