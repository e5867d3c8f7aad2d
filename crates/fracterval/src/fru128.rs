//! 128-bit Fracterval
//!
//! Accumulator width. Every entropy and divergence running sum is a `Fru128`.

use serde::{Deserialize, Serialize};

use crate::common::fracterval_common;
use crate::fru64::Fru64;
use crate::wide::{div_wide, mul_upper, mul_wide};

/// Sound interval `[lower/2^128, (upper+1)/2^128)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fru128 {
    lower: u128,
    upper: u128,
}

fracterval_common!(Fru128, u128, 128);

impl Fru128 {
    /// Product of two fractions. Cannot overflow.
    #[inline]
    pub fn multiply(self, other: Self) -> Self {
        Self {
            lower: mul_wide(self.lower, other.lower).0,
            upper: mul_upper(self.upper, other.upper),
        }
    }

    /// Product with the exact fraction `m/2^128`.
    #[inline]
    pub fn multiply_mantissa(self, m: u128) -> Self {
        if m == 0 {
            return Self::ZERO;
        }
        let (hi, lo) = mul_wide(self.upper, m);
        // (upper + 1) * m - 1, which cannot borrow out of the high word since m > 0
        let (_, carry) = lo.overflowing_add(m - 1);
        Self {
            lower: mul_wide(self.lower, m).0,
            upper: hi + carry as u128,
        }
    }

    /// Product with an integer. Saturates and raises `overflow` past one.
    #[inline]
    pub fn multiply_u64(self, k: u64, overflow: &mut bool) -> Self {
        if k == 0 {
            return Self::ZERO;
        }
        let k = k as u128;
        let lower = match self.lower.checked_mul(k) {
            Some(v) => v,
            None => {
                *overflow = true;
                return Self::ONE;
            }
        };
        let upper = match self
            .upper
            .checked_mul(k)
            .and_then(|v| v.checked_add(k - 1))
        {
            Some(v) => v,
            None => {
                *overflow = true;
                u128::MAX
            }
        };
        Self { lower, upper }
    }

    /// Quotient of two fractions, clipped at one. A quotient reaching one, or
    /// a divisor whose lower bound is zero, saturates and raises `overflow`.
    pub fn divide(self, divisor: Self, overflow: &mut bool) -> Self {
        let lower = if divisor.upper == u128::MAX {
            self.lower
        } else {
            match div_wide(self.lower, 0, divisor.upper + 1) {
                Some((q, _)) => q,
                None => {
                    *overflow = true;
                    return Self::ONE;
                }
            }
        };
        let upper = match div_wide(self.upper, u128::MAX, divisor.lower) {
            Some((q, _)) => q,
            None => {
                *overflow = true;
                u128::MAX
            }
        };
        Self { lower, upper }
    }

    /// The fraction `numerator/denominator` as a fractoid. Equal operands give
    /// one; a ratio above one or a zero denominator saturates and raises
    /// `overflow`.
    pub fn from_ratio(numerator: u128, denominator: u128, overflow: &mut bool) -> Self {
        if numerator == denominator && denominator != 0 {
            return Self::ONE;
        }
        match div_wide(numerator, 0, denominator) {
            Some((q, _)) => Self::fractoid(q),
            None => {
                *overflow = true;
                Self::ONE
            }
        }
    }

    /// Truncates to 64-bit mantissas, widening the interval as needed.
    #[inline]
    pub const fn narrow(self) -> Fru64 {
        Fru64::from_bounds((self.lower >> 64) as u64, (self.upper >> 64) as u64)
    }

    pub(crate) const fn from_bounds(lower: u128, upper: u128) -> Self {
        Self { lower, upper }
    }
}
