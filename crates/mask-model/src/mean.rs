//! Mean and Sign Detection
//!
//! Kurtosis and variance measure deviation from one global mean. Whether
//! masks are two's-complement values changes that mean drastically, so both
//! readings are tried and the one with the smaller total squared deviation
//! wins.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::MaskError;

/// Global mean of a mask list under the detected interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskMean {
    /// Sum of masks, with the top bit flipped when `signed`
    pub sum: u128,
    /// Number of masks
    pub count: u64,
    /// Whether masks read as two's complement
    pub signed: bool,
    /// Ceiling of the mask space
    pub mask_max: u32,
    /// Largest `|N x - Σx|` over the list
    pub spread: u128,
}

impl MaskMean {
    /// Half the mask span, the bias added by the top-bit flip
    pub fn half_span(&self) -> u64 {
        (self.mask_max as u64 + 1) >> 1
    }

    /// Maps a mask into the unsigned space the sum was taken in.
    #[inline]
    pub fn biased(&self, mask: u32) -> u64 {
        if self.signed {
            mask as u64 ^ self.half_span()
        } else {
            mask as u64
        }
    }

    /// `|N x - Σx|` for one mask, exact.
    #[inline]
    pub fn distance(&self, mask: u32) -> u128 {
        (self.biased(mask) as u128 * self.count as u128).abs_diff(self.sum)
    }

    /// Mean as a float under the detected interpretation.
    pub fn value_f64(&self) -> f64 {
        let mean = self.sum as f64 / self.count as f64;
        if self.signed {
            mean - self.half_span() as f64
        } else {
            mean
        }
    }
}

/// Detects sign and computes the mean. Signed detection needs
/// `mask_max + 1` to be a power of two; ties pick unsigned.
///
/// With `h` the half span, `k` the masks at or above `h`, `L` the sum of the
/// masks below it and `H` the sum of the masks above it less `k h`, the
/// signed reading lowers the total squared deviation exactly when
/// `k L < (N - k) H`. Both sides stay integers.
pub fn mean_get(masks: &[u32], mask_max: u32) -> Result<MaskMean, MaskError> {
    if masks.is_empty() {
        return Err(MaskError::EmptyList);
    }
    let span = mask_max as u64 + 1;
    if !span.is_power_of_two() {
        return Err(MaskError::SpanNotPowerOfTwo(mask_max));
    }
    let half = span >> 1;

    let (mut low_sum, mut high_sum, mut high) = (0u128, 0u128, 0u128);
    for &m in masks {
        let u = m as u64;
        if u >= half {
            high_sum += (u - half) as u128;
            high += 1;
        } else {
            low_sum += u as u128;
        }
    }
    let n = masks.len() as u128;
    // each side is below N^2 2^32, which fits while N < 2^48
    let unsigned_side = high * low_sum;
    let signed_side = (n - high) * high_sum;
    let signed = unsigned_side < signed_side;

    // Σu = L + H + k h and Σs = L + H + (N - k) h
    let lifted = if signed { n - high } else { high };
    let sum = low_sum + high_sum + lifted * half as u128;
    let mut mean = MaskMean {
        sum,
        count: masks.len() as u64,
        signed,
        mask_max,
        spread: 0,
    };
    mean.spread = masks
        .iter()
        .map(|&m| mean.distance(m))
        .max()
        .unwrap_or(0);

    debug!(
        "Mask mean over {} masks: k L = {}, (N - k) H = {}, signed={}, spread={}",
        masks.len(),
        unsigned_side,
        signed_side,
        signed,
        mean.spread
    );
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_bytes() {
        let mean = mean_get(&[0, 255], 255).unwrap();
        assert!(mean.signed);
        assert!((mean.value_f64() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unsigned_bytes() {
        let mean = mean_get(&[100, 110, 120], 255).unwrap();
        assert!(!mean.signed);
        assert!((mean.value_f64() - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_prefers_unsigned() {
        let mean = mean_get(&[7, 7, 7], 255).unwrap();
        assert!(!mean.signed);
    }

    #[test]
    fn test_biased() {
        let mean = mean_get(&[0, 255], 255).unwrap();
        assert_eq!(mean.biased(255), 127);
        assert_eq!(mean.biased(0), 128);
    }

    #[test]
    fn test_wide_masks_decided_exactly() {
        // one high mask against 4096 low ones, a single unit from the tie
        let base = (1u32 << 30) + 12345;
        let mut masks = vec![base; 4096];
        masks.push((1 << 31) + base);

        masks[0] = base + 1;
        assert!(!mean_get(&masks, u32::MAX).unwrap().signed);
        masks[0] = base - 1;
        assert!(mean_get(&masks, u32::MAX).unwrap().signed);
        masks[0] = base;
        assert!(!mean_get(&masks, u32::MAX).unwrap().signed);
    }

    #[test]
    fn test_sum_and_spread() {
        let mean = mean_get(&[100, 110, 120], 255).unwrap();
        assert_eq!(mean.sum, 330);
        assert_eq!(mean.spread, 30);
        assert_eq!(mean.distance(110), 0);

        let mean = mean_get(&[0, 255], 255).unwrap();
        assert_eq!(mean.sum, 255);
        assert_eq!(mean.spread, 1);
    }

    #[test]
    fn test_rejects_odd_span() {
        assert_eq!(mean_get(&[1], 99), Err(MaskError::SpanNotPowerOfTwo(99)));
        assert_eq!(mean_get(&[], 255), Err(MaskError::EmptyList));
    }
}
