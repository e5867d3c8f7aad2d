//! Exact natural logarithms of integers.
//!
//! These are the slow paths behind the log caches. Results are computed in
//! `Fru128` arithmetic from the series `atanh(z) = z + z^3/3 + z^5/5 + ...`
//! with an explicit bound on the truncated tail.

use crate::constants::LN2;
use crate::fru128::Fru128;

/// Tail allowance once a series term drops below one ulp. With `z <= 1/3`
/// the remaining terms sum to less than 9/8 ulp.
const SERIES_TAIL: Fru128 = Fru128::from_bounds(0, 1);

/// `atanh(p/q)` for `p/q <= 1/3`.
fn atanh_ratio(p: u128, q: u128, overflow: &mut bool) -> Fru128 {
    if p == 0 {
        return Fru128::ZERO;
    }
    let z = Fru128::from_ratio(p, q, overflow);
    let z2 = z.multiply(z);

    let mut sum = z;
    let mut power = z;
    let mut k = 3u64;
    loop {
        power = power.multiply(z2);
        let term = power.divide_u64(k, overflow);
        if term.upper() == 0 {
            break;
        }
        sum = sum.add(term, overflow);
        k += 2;
    }
    sum.add(SERIES_TAIL, overflow)
}

/// `ln(n)/64` as a fraction. `ln(0)` saturates and raises `overflow`.
pub fn log_u64(n: u64, overflow: &mut bool) -> Fru128 {
    match n {
        0 => {
            *overflow = true;
            Fru128::ZERO
        }
        1 => Fru128::ZERO,
        _ => {
            let k = 63 - n.leading_zeros();
            let base = 1u64 << k;
            let whole = LN2.shift_right(6).multiply_u64(k as u64, overflow);
            // ln(n/2^k) = 2 atanh((n - 2^k) / (n + 2^k)), scaled by 1/64
            let part = atanh_ratio((n - base) as u128, n as u128 + base as u128, overflow)
                .shift_right(5);
            whole.add(part, overflow)
        }
    }
}

/// `ln(n) - ln(n-1)` as a fraction. Zero for `n <= 1`.
pub fn log_delta_u64(n: u64, overflow: &mut bool) -> Fru128 {
    if n <= 1 {
        return Fru128::ZERO;
    }
    // ln(n/(n-1)) = 2 atanh(1/(2n-1))
    let denominator = 2 * n as u128 - 1;
    atanh_ratio(1, denominator, overflow).shift_left(1, overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ln_of(x: Fru128) -> (f64, f64) {
        (x.lower_f64() * 64.0, x.upper_f64() * 64.0)
    }

    #[test]
    fn test_log_small_integers() {
        let mut overflow = false;
        for n in [2u64, 3, 10, 255, 256, 1000, 65_537] {
            let (lo, hi) = ln_of(log_u64(n, &mut overflow));
            let expect = (n as f64).ln();
            assert!(lo <= expect + 1e-12, "n={n} lo={lo} expect={expect}");
            assert!(expect <= hi + 1e-12, "n={n} hi={hi} expect={expect}");
            assert!(hi - lo < 1e-15);
        }
        assert!(!overflow);
    }

    #[test]
    fn test_log_of_power_of_two_is_tight() {
        let mut overflow = false;
        let x = log_u64(1 << 40, &mut overflow);
        let expected = LN2.shift_right(6).multiply_u64(40, &mut overflow);
        assert!(x.overlaps(&expected));
        assert!(x.upper() - x.lower() < 256);
    }

    #[test]
    fn test_log_max_does_not_overflow() {
        let mut overflow = false;
        let x = log_u64(u64::MAX, &mut overflow);
        assert!(!overflow);
        assert!((x.to_f64() * 64.0 - 64.0 * 2f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_log_edge_cases() {
        let mut overflow = false;
        assert_eq!(log_u64(1, &mut overflow), Fru128::ZERO);
        assert!(!overflow);
        log_u64(0, &mut overflow);
        assert!(overflow);
    }

    #[test]
    fn test_log_delta_two_is_ln2() {
        let mut overflow = false;
        let x = log_delta_u64(2, &mut overflow);
        assert!(x.overlaps(&LN2));
        assert!(!overflow);
    }

    #[test]
    fn test_log_delta_matches_difference() {
        let mut overflow = false;
        for n in [3u64, 17, 1000, 1 << 33] {
            let delta = log_delta_u64(n, &mut overflow);
            let expect = (1.0 / (n as f64 - 1.0)).ln_1p();
            assert!((delta.to_f64() - expect).abs() <= expect * 1e-9, "n={n}");
        }
        assert_eq!(log_delta_u64(1, &mut overflow), Fru128::ZERO);
        assert!(!overflow);
    }
}
