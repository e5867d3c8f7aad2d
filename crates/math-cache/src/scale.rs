//! Conversions into the accumulator scale.
//!
//! Accumulators are `Fru128` fractions read as nats times `2^-64`, so the
//! mantissa is 64.64 fixed point. Cached logs come in two other shapes: `ln/64`
//! for logs and a plain fraction for log-deltas.

use fracterval::{log_u64, Fru128, Fru64};

/// Shift taking an `ln/64` fraction to nats times `2^-64`.
const LOG_TO_SCALED: u32 = 58;

/// A cached `ln(n)/64` as a scaled value.
#[inline]
pub fn log_scaled(x: Fru64) -> Fru128 {
    Fru128::new((x.lower() as u128) << 6, ((x.upper() as u128) << 6) | 63)
}

/// A cached `ln(n) - ln(n-1)` as a scaled value.
#[inline]
pub fn log_delta_scaled(x: Fru64) -> Fru128 {
    Fru128::new(x.lower() as u128, x.upper() as u128)
}

/// An integer count as a scaled value.
#[inline]
pub fn int_scaled(n: u64) -> Fru128 {
    Fru128::fractoid((n as u128) << 64)
}

/// `ln(n)` evaluated without a cache, as a scaled value.
#[inline]
pub fn exact_log_scaled(n: u64, overflow: &mut bool) -> Fru128 {
    log_u64(n, overflow).shift_right(LOG_TO_SCALED)
}

/// Reads a scaled value as nats.
pub fn scaled_to_f64(x: Fru128) -> f64 {
    x.to_f64() * 2f64.powi(64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_scaled_reads_back() {
        assert_eq!(scaled_to_f64(int_scaled(12)), 12.0);
    }

    #[test]
    fn test_cached_log_contains_exact() {
        let mut overflow = false;
        let exact = exact_log_scaled(1000, &mut overflow);
        let cached = log_scaled(log_u64(1000, &mut overflow).narrow());
        assert!(cached.contains(&exact));
        assert!((scaled_to_f64(cached) - 1000f64.ln()).abs() < 1e-12);
    }
}
