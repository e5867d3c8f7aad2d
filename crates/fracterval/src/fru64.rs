//! 64-bit Fracterval
//!
//! Cache width. Logs of small integers are stored in this form.

use serde::{Deserialize, Serialize};

use crate::common::fracterval_common;
use crate::fru128::Fru128;

/// Sound interval `[lower/2^64, (upper+1)/2^64)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fru64 {
    lower: u64,
    upper: u64,
}

fracterval_common!(Fru64, u64, 64);

impl Fru64 {
    /// Product of two fractions. Cannot overflow.
    #[inline]
    pub fn multiply(self, other: Self) -> Self {
        let lower = (self.lower as u128 * other.lower as u128) >> 64;
        let (a, b) = (self.upper as u128, other.upper as u128);
        let upper = (a * b + a + b) >> 64;
        Self {
            lower: lower as u64,
            upper: upper as u64,
        }
    }

    /// Product with the exact fraction `m/2^64`.
    #[inline]
    pub fn multiply_mantissa(self, m: u64) -> Self {
        if m == 0 {
            return Self::ZERO;
        }
        let m = m as u128;
        Self {
            lower: ((self.lower as u128 * m) >> 64) as u64,
            upper: ((self.upper as u128 * m + m - 1) >> 64) as u64,
        }
    }

    /// Product with an integer. Saturates and raises `overflow` past one.
    #[inline]
    pub fn multiply_u64(self, k: u64, overflow: &mut bool) -> Self {
        if k == 0 {
            return Self::ZERO;
        }
        let lower = match self.lower.checked_mul(k) {
            Some(v) => v,
            None => {
                *overflow = true;
                return Self::ONE;
            }
        };
        let upper = match self.upper.checked_mul(k).and_then(|v| v.checked_add(k - 1)) {
            Some(v) => v,
            None => {
                *overflow = true;
                u64::MAX
            }
        };
        Self { lower, upper }
    }

    /// Quotient of two fractions, clipped at one.
    pub fn divide(self, divisor: Self, overflow: &mut bool) -> Self {
        let lower = (self.lower as u128) << 64;
        let lower = lower / (divisor.upper as u128 + 1);
        if lower > u64::MAX as u128 {
            *overflow = true;
            return Self::ONE;
        }
        let upper = if divisor.lower == 0 {
            *overflow = true;
            u64::MAX
        } else {
            let numerator = ((self.upper as u128) << 64) | u64::MAX as u128;
            let q = numerator / divisor.lower as u128;
            if q > u64::MAX as u128 {
                *overflow = true;
                u64::MAX
            } else {
                q as u64
            }
        };
        Self {
            lower: lower as u64,
            upper,
        }
    }

    /// The fraction `numerator/denominator` as a fractoid.
    pub fn from_ratio(numerator: u64, denominator: u64, overflow: &mut bool) -> Self {
        if numerator == denominator && denominator != 0 {
            return Self::ONE;
        }
        if denominator == 0 || numerator > denominator {
            *overflow = true;
            return Self::ONE;
        }
        Self::fractoid((((numerator as u128) << 64) / denominator as u128) as u64)
    }

    /// Extends to 128-bit mantissas without losing soundness.
    #[inline]
    pub const fn widen(self) -> Fru128 {
        Fru128::from_bounds(
            (self.lower as u128) << 64,
            ((self.upper as u128) << 64) | u64::MAX as u128,
        )
    }

    pub(crate) const fn from_bounds(lower: u64, upper: u64) -> Self {
        Self { lower, upper }
    }
}
