//! Cached logs in the accumulator scale.

use fracterval::Fru128;
use math_cache::scale::{log_delta_scaled, log_scaled};
use math_cache::LogCache;

/// Borrowed log cache returning scaled (64.64 nats) values
pub(crate) struct ScaledLogs<'a> {
    cache: &'a mut LogCache,
}

impl<'a> ScaledLogs<'a> {
    pub fn new(cache: &'a mut LogCache) -> Self {
        Self { cache }
    }

    /// `ln n`, for `n >= 1`
    #[inline]
    pub fn ln(&mut self, n: u64, overflow: &mut bool) -> Fru128 {
        log_scaled(self.cache.log(n, overflow))
    }

    /// `ln n - ln(n-1)`
    #[inline]
    pub fn ld(&mut self, n: u64, overflow: &mut bool) -> Fru128 {
        log_delta_scaled(self.cache.log_delta(n, overflow))
    }

    /// `n ln n - (n-1) ln(n-1)`, the step of `n ln n`
    #[inline]
    pub fn gd(&mut self, n: u64, overflow: &mut bool) -> Fru128 {
        if n < 2 {
            return Fru128::ZERO;
        }
        let ln = self.ln(n, overflow);
        let tail = self.ld(n, overflow).multiply_u64(n - 1, overflow);
        ln.add(tail, overflow)
    }

    #[inline]
    pub fn n_ln_n(&mut self, n: u64, overflow: &mut bool) -> Fru128 {
        if n < 2 {
            return Fru128::ZERO;
        }
        self.ln(n, overflow).multiply_u64(n, overflow)
    }

    pub fn trace_stats(&mut self, label: &str) {
        self.cache.trace_stats(label);
    }
}
