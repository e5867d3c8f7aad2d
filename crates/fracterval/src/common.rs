//! Operations shared by both mantissa widths.
//!
//! Only the width-independent operations live here. Products and quotients
//! differ per width and are written out in `fru64.rs` and `fru128.rs`.

macro_rules! fracterval_common {
    ($name:ident, $mant:ty, $bits:expr) => {
        impl $name {
            /// The fractoid zero.
            pub const ZERO: Self = Self { lower: 0, upper: 0 };

            /// Saturated one. Every upper bound is exclusive, so multiplying by
            /// this value stays sound even though one itself is not representable.
            pub const ONE: Self = Self {
                lower: <$mant>::MAX,
                upper: <$mant>::MAX,
            };

            /// Creates a fracterval; the bounds are swapped if given out of order.
            #[inline]
            pub fn new(lower: $mant, upper: $mant) -> Self {
                if lower <= upper {
                    Self { lower, upper }
                } else {
                    Self { lower: upper, upper: lower }
                }
            }

            /// Creates a zero-width fracterval covering `[v, v + ulp)`.
            #[inline]
            pub const fn fractoid(v: $mant) -> Self {
                Self { lower: v, upper: v }
            }

            /// Inclusive lower mantissa.
            #[inline]
            pub const fn lower(&self) -> $mant {
                self.lower
            }

            /// Upper mantissa; the represented interval ends one ulp above it.
            #[inline]
            pub const fn upper(&self) -> $mant {
                self.upper
            }

            #[inline]
            pub const fn is_fractoid(&self) -> bool {
                self.lower == self.upper
            }

            /// Floor of the midpoint of `[lower, upper + 1)`.
            #[inline]
            pub const fn mean(&self) -> $mant {
                let span = self.upper - self.lower;
                self.lower + (span >> 1) + (span & 1)
            }

            /// Orders two fractervals by their means. Intervals whose means are
            /// bit-identical compare equal, however different their widths.
            #[inline]
            pub fn cmp_mean(&self, other: &Self) -> std::cmp::Ordering {
                self.mean().cmp(&other.mean())
            }

            /// Whether `other` lies entirely within `self`.
            #[inline]
            pub const fn contains(&self, other: &Self) -> bool {
                self.lower <= other.lower && other.upper <= self.upper
            }

            /// Whether the two intervals share at least one ulp.
            #[inline]
            pub const fn overlaps(&self, other: &Self) -> bool {
                self.lower <= other.upper && other.lower <= self.upper
            }

            /// Sum of two fractervals. Saturates and raises `overflow` past the top.
            #[inline]
            pub fn add(self, other: Self, overflow: &mut bool) -> Self {
                let lower = match self.lower.checked_add(other.lower) {
                    Some(v) => v,
                    None => {
                        *overflow = true;
                        return Self::ONE;
                    }
                };
                let upper = match self
                    .upper
                    .checked_add(other.upper)
                    .and_then(|v| v.checked_add(1))
                {
                    Some(v) => v,
                    None => {
                        *overflow = true;
                        <$mant>::MAX
                    }
                };
                Self { lower, upper }
            }

            /// Difference of two fractervals. Clips at zero and raises `overflow`
            /// on underflow of either bound.
            #[inline]
            pub fn subtract(self, other: Self, overflow: &mut bool) -> Self {
                let lower = match self
                    .lower
                    .checked_sub(other.upper)
                    .and_then(|v| v.checked_sub(1))
                {
                    Some(v) => v,
                    None => {
                        *overflow = true;
                        0
                    }
                };
                let upper = match self.upper.checked_sub(other.lower) {
                    Some(v) => v,
                    None => {
                        *overflow = true;
                        0
                    }
                };
                Self { lower, upper }
            }

            /// Difference of two fractervals whose exact difference is known to be
            /// non-negative. The lower bound clamps at zero silently; only an
            /// upper-bound underflow, which means the premise was false, raises
            /// `overflow`.
            #[inline]
            pub fn subtract_clamped(self, other: Self, overflow: &mut bool) -> Self {
                let lower = self
                    .lower
                    .saturating_sub(other.upper)
                    .saturating_sub(1);
                let upper = match self.upper.checked_sub(other.lower) {
                    Some(v) => v,
                    None => {
                        *overflow = true;
                        0
                    }
                };
                Self {
                    lower: lower.min(upper),
                    upper,
                }
            }

            /// Multiplies by `2^n`.
            #[inline]
            pub fn shift_left(self, n: u32, overflow: &mut bool) -> Self {
                if n == 0 {
                    return self;
                }
                let lower = if self.lower == 0 {
                    0
                } else if n >= $bits || self.lower.leading_zeros() < n {
                    *overflow = true;
                    return Self::ONE;
                } else {
                    self.lower << n
                };
                let upper = if n >= $bits || self.upper.leading_zeros() < n {
                    *overflow = true;
                    <$mant>::MAX
                } else {
                    (self.upper << n) | (((1 as $mant) << n) - 1)
                };
                Self { lower, upper }
            }

            /// Divides by `2^n`. Never overflows.
            #[inline]
            pub fn shift_right(self, n: u32) -> Self {
                Self {
                    lower: self.lower.checked_shr(n).unwrap_or(0),
                    upper: self.upper.checked_shr(n).unwrap_or(0),
                }
            }

            /// Smallest fracterval containing both operands.
            #[inline]
            pub fn union(self, other: Self) -> Self {
                Self {
                    lower: self.lower.min(other.lower),
                    upper: self.upper.max(other.upper),
                }
            }

            /// One's-complement reflection, `1 - x`.
            #[inline]
            pub const fn not(self) -> Self {
                Self {
                    lower: !self.upper,
                    upper: !self.lower,
                }
            }

            /// Divides by an integer. Division by zero saturates to one and
            /// raises `overflow`.
            #[inline]
            pub fn divide_u64(self, divisor: u64, overflow: &mut bool) -> Self {
                if divisor == 0 {
                    *overflow = true;
                    return Self::ONE;
                }
                let divisor = divisor as $mant;
                Self {
                    lower: self.lower / divisor,
                    upper: self.upper / divisor,
                }
            }

            /// Inclusive lower bound as a float.
            pub fn lower_f64(&self) -> f64 {
                self.lower as f64 / 2f64.powi($bits)
            }

            /// Exclusive upper bound as a float.
            pub fn upper_f64(&self) -> f64 {
                (self.upper as f64 + 1.0) / 2f64.powi($bits)
            }

            /// Midpoint as a float, for reporting only.
            pub fn to_f64(&self) -> f64 {
                (self.lower_f64() + self.upper_f64()) / 2.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }
    };
}

pub(crate) use fracterval_common;
