//! Normalisation of entropies onto [0, 1]
//!
//! Compressivity is `1 - entropy / raw`, where `raw` is the entropy of the
//! same sweep had every mask been equally likely (`W ln Z`). One means fully
//! compressible. Values above `raw` clamp to zero.
//!
//! Two algebraically equal forms are used. When the entropy lies wholly
//! below `raw`, `(raw - entropy) / raw` keeps the small difference exact. When
//! the intervals touch, `1 - entropy / raw` avoids subtracting overlapping
//! intervals.

use fracterval::{Fru128, Reciprocal};

/// Precomputed `1 / raw` for normalising many entropies against one raw
/// entropy
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    recip: Reciprocal,
    raw: Fru128,
}

impl Normalizer {
    pub fn new(raw: Fru128, overflow: &mut bool) -> Self {
        let recip = if raw.lower() == 0 {
            Reciprocal::new(Fru128::ONE, overflow)
        } else {
            Reciprocal::new(raw, overflow)
        };
        Self { recip, raw }
    }

    pub fn raw(&self) -> Fru128 {
        self.raw
    }

    /// `1 - entropy / raw`, clamped to [0, 1]. A zero raw entropy (a single
    /// possible mask) counts as fully compressible.
    #[inline]
    pub fn compressivity(&self, entropy: Fru128, overflow: &mut bool) -> Fru128 {
        if self.raw.lower() == 0 {
            return Fru128::ONE;
        }
        // the true ratio never exceeds one, so saturation here is sound
        let mut clipped = false;
        if entropy.upper() < self.raw.lower() {
            let slack = self.raw.subtract_clamped(entropy, overflow);
            self.recip.apply(slack, &mut clipped)
        } else {
            self.recip.apply(entropy, &mut clipped).not()
        }
    }
}

/// Agnentropy normalised against `raw = W ln Z`
pub fn compressivity(entropy: Fru128, raw: Fru128, overflow: &mut bool) -> Fru128 {
    Normalizer::new(raw, overflow).compressivity(entropy, overflow)
}

/// Logfreedom normalised against `raw = W ln Z`
pub fn dyspoissonism(logfreedom: Fru128, raw: Fru128, overflow: &mut bool) -> Fru128 {
    compressivity(logfreedom, raw, overflow)
}

/// Shannon entropy normalised against `raw = W ln Z`
pub fn shannonism(shannon: Fru128, raw: Fru128, overflow: &mut bool) -> Fru128 {
    compressivity(shannon, raw, overflow)
}

/// Diventropy normalised against `raw = W ln Z`
pub fn divcompressivity(diventropy: Fru128, raw: Fru128, overflow: &mut bool) -> Fru128 {
    compressivity(diventropy, raw, overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use math_cache::scale::{exact_log_scaled, int_scaled};

    fn raw(sweep_len: u64, span: u64) -> Fru128 {
        let mut overflow = false;
        exact_log_scaled(span, &mut overflow).multiply_u64(sweep_len, &mut overflow)
    }

    #[test]
    fn test_zero_entropy_is_fully_compressible() {
        let mut overflow = false;
        let c = compressivity(Fru128::ZERO, raw(8, 256), &mut overflow);
        assert!(!overflow);
        assert!(c.lower_f64() > 1.0 - 1e-15);
    }

    #[test]
    fn test_half_raw_is_half() {
        let mut overflow = false;
        let raw = raw(16, 256);
        let half = raw.shift_right(1);
        let c = shannonism(half, raw, &mut overflow);
        assert!(!overflow);
        assert!((c.to_f64() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_above_raw_clamps_to_zero() {
        let mut overflow = false;
        let raw = raw(4, 16);
        let c = compressivity(raw.add(int_scaled(3), &mut overflow), raw, &mut overflow);
        assert!(!overflow);
        assert!(c.upper_f64() < 1e-15);
    }

    #[test]
    fn test_entropy_equal_to_raw_is_near_zero() {
        let mut overflow = false;
        let raw = raw(4, 16);
        let c = dyspoissonism(raw, raw, &mut overflow);
        assert!(c.contains(&Fru128::ZERO) || c.upper_f64() < 1e-15);
    }

    #[test]
    fn test_zero_raw_is_one() {
        let mut overflow = false;
        assert_eq!(
            divcompressivity(Fru128::ZERO, Fru128::ZERO, &mut overflow),
            Fru128::ONE
        );
        assert!(!overflow);
    }
}
