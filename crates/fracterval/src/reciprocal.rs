//! Precomputed reciprocals.
//!
//! Hot loops normalise by a per-call constant. Computing `1/x` once and
//! multiplying afterwards is cheaper than dividing, and keeps the interval
//! tighter than repeated quotients would.

use crate::fru128::Fru128;
use crate::wide::div_wide;

/// `1/x` held as a fraction mantissa times `2^shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reciprocal {
    mantissa: Fru128,
    shift: u32,
}

impl Reciprocal {
    /// Builds the reciprocal of a fraction. A lower bound of zero saturates
    /// and raises `overflow`.
    pub fn new(x: Fru128, overflow: &mut bool) -> Self {
        if x.lower() == 0 {
            *overflow = true;
            return Self {
                mantissa: Fru128::ONE,
                shift: 128,
            };
        }

        // x >= 2^(127-e)/2^128, so 1/x <= 2^(e+1)
        let e = x.lower().leading_zeros();
        let numerator_hi = 1u128 << (127 - e);

        let lower = if x.upper() == u128::MAX {
            numerator_hi
        } else {
            div_wide(numerator_hi, 0, x.upper() + 1)
                .map(|(q, _)| q)
                .unwrap_or(u128::MAX)
        };
        let upper = div_wide(numerator_hi, 0, x.lower())
            .map(|(q, _)| q)
            .unwrap_or(u128::MAX);

        Self {
            mantissa: Fru128::new(lower, upper),
            shift: e + 1,
        }
    }

    /// Normalised mantissa of the reciprocal.
    pub fn mantissa(&self) -> Fru128 {
        self.mantissa
    }

    /// Binary exponent applied after multiplying by the mantissa.
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// `y / x`, saturating at one.
    #[inline]
    pub fn apply(&self, y: Fru128, overflow: &mut bool) -> Fru128 {
        self.apply_scaled(y, 0, overflow)
    }

    /// `y / (x * 2^right_shift)`, saturating at one.
    #[inline]
    pub fn apply_scaled(&self, y: Fru128, right_shift: u32, overflow: &mut bool) -> Fru128 {
        let product = y.multiply(self.mantissa);
        if self.shift >= right_shift {
            product.shift_left(self.shift - right_shift, overflow)
        } else {
            product.shift_right(right_shift - self.shift)
        }
    }
}
