//! Log-Gamma Evaluator
//!
//! `ln Γ(n)` for positive integers, in the accumulator scale. Arguments up to
//! the table length come from an immutable table of cumulative log sums.
//! Larger arguments use Stirling's series.

use fracterval::{Fru128, HALF_LN_2PI};
use tracing::info;

use crate::alloc::filled;
use crate::scale::{exact_log_scaled, int_scaled};
use crate::CacheError;

/// Default number of tabulated arguments
pub const DEFAULT_TABLE_LEN: u64 = 1024;

/// Smallest argument for which six Stirling terms are accurate to one ulp
pub const STIRLING_MIN: u64 = 64;

/// Tabulated `ln Γ(n)` with a Stirling fallback. Immutable once built, so
/// one instance can be shared across threads behind an `Arc`.
#[derive(Debug)]
pub struct LogGammaCache {
    /// `table[i]` is `ln Γ(i + 1)`
    table: Vec<Fru128>,
}

impl LogGammaCache {
    /// Tabulate `ln Γ(n)` for `1 <= n <= table_len`.
    pub fn new(table_len: u64) -> Result<Self, CacheError> {
        if table_len < STIRLING_MIN {
            return Err(CacheError::TableTooShort {
                len: table_len,
                min: STIRLING_MIN,
            });
        }
        let len = usize::try_from(table_len).map_err(|_| CacheError::AllocationFailed {
            what: "log-gamma table",
            len: usize::MAX,
        })?;
        let mut table = filled(len, Fru128::ZERO, "log-gamma table")?;

        // Γ(n + 1) = n Γ(n), and Γ(1) = Γ(2) = 1
        let mut overflow = false;
        for i in 2..len {
            let log_n = exact_log_scaled(i as u64, &mut overflow);
            table[i] = table[i - 1].add(log_n, &mut overflow);
        }

        info!("Log-gamma table built with {} entries", len);
        Ok(Self { table })
    }

    /// Largest tabulated argument
    pub fn table_len(&self) -> u64 {
        self.table.len() as u64
    }

    /// `ln Γ(n)`. `n = 0` saturates and raises `overflow`.
    pub fn log_gamma(&self, n: u64, overflow: &mut bool) -> Fru128 {
        if n == 0 {
            *overflow = true;
            return Fru128::ONE;
        }
        match self.table.get((n - 1) as usize) {
            Some(&value) => value,
            None => stirling(n, overflow),
        }
    }
}

/// Stirling's series with six Bernoulli terms, valid for `n >= STIRLING_MIN`:
///
/// `ln Γ(n) = (n - 1/2) ln n - n + ln(2π)/2 + Σ B_2k / (2k (2k-1) n^(2k-1))`
fn stirling(n: u64, overflow: &mut bool) -> Fru128 {
    let ln_n = exact_log_scaled(n, overflow);
    let main = ln_n
        .multiply_u64(2 * n - 1, overflow)
        .shift_right(1)
        .subtract(int_scaled(n), overflow)
        .add(HALF_LN_2PI.shift_right(64), overflow);

    let t = Fru128::from_ratio(1, n as u128, overflow);
    let t2 = t.multiply(t);
    let t3 = t.multiply(t2);
    let t5 = t3.multiply(t2);
    let t7 = t5.multiply(t2);
    let t9 = t7.multiply(t2);
    let t11 = t9.multiply(t2);

    let positive = t
        .divide_u64(12, overflow)
        .add(t5.divide_u64(1260, overflow), overflow)
        .add(t9.divide_u64(1188, overflow), overflow);
    let negative = t3
        .divide_u64(360, overflow)
        .add(t7.divide_u64(1680, overflow), overflow)
        .add(
            t11.multiply_u64(691, overflow).divide_u64(360_360, overflow),
            overflow,
        );
    // Alternating and decreasing, so the correction is positive
    let correction = positive.subtract_clamped(negative, overflow).shift_right(64);

    let sum = main.add(correction, overflow);
    let tail = Fru128::fractoid(1);
    let low = sum.subtract_clamped(tail, overflow);
    let high = sum.add(tail, overflow);
    low.union(high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::scaled_to_f64;

    #[test]
    fn test_rejects_short_table() {
        assert_eq!(
            LogGammaCache::new(10).unwrap_err(),
            CacheError::TableTooShort { len: 10, min: 64 }
        );
    }

    #[test]
    fn test_factorials() {
        let cache = LogGammaCache::new(64).unwrap();
        let mut overflow = false;
        assert_eq!(cache.log_gamma(1, &mut overflow), Fru128::ZERO);
        assert_eq!(cache.log_gamma(2, &mut overflow), Fru128::ZERO);
        let ln_24 = scaled_to_f64(cache.log_gamma(5, &mut overflow));
        assert!((ln_24 - 24f64.ln()).abs() < 1e-12);
        assert!(!overflow);
    }

    #[test]
    fn test_stirling_agrees_with_table() {
        let short = LogGammaCache::new(64).unwrap();
        let long = LogGammaCache::new(300).unwrap();
        let mut overflow = false;
        for n in [65u64, 100, 250, 300] {
            let approx = short.log_gamma(n, &mut overflow);
            let tabulated = long.log_gamma(n, &mut overflow);
            assert!(approx.overlaps(&tabulated), "n={n}");
        }
        assert!(!overflow);
    }

    #[test]
    fn test_large_argument() {
        let cache = LogGammaCache::new(DEFAULT_TABLE_LEN).unwrap();
        let mut overflow = false;
        let n = 1_000_000u64;
        let x = scaled_to_f64(cache.log_gamma(n, &mut overflow));
        let nf = n as f64;
        let expect = (nf - 0.5) * nf.ln() - nf + 0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((x - expect).abs() / expect < 1e-12);
        assert!(!overflow);
    }

    #[test]
    fn test_zero_argument_sets_flag() {
        let cache = LogGammaCache::new(DEFAULT_TABLE_LEN).unwrap();
        let mut overflow = false;
        cache.log_gamma(0, &mut overflow);
        assert!(overflow);
    }
}
