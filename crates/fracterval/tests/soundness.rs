//! Property tests: every operation contains the exact result of any pair of
//! points drawn from its operands.

use fracterval::{Fru128, Fru64, Reciprocal};
use proptest::prelude::*;

fn fru64_with_point() -> impl Strategy<Value = (Fru64, u64)> {
    (any::<u64>(), any::<u64>(), any::<u64>()).prop_map(|(a, b, t)| {
        let x = Fru64::new(a, b);
        let span = x.upper() - x.lower();
        let point = if span == u64::MAX { t } else { x.lower() + t % (span + 1) };
        (x, point)
    })
}

proptest! {
    #[test]
    fn multiply_contains_point_product(
        (x, p) in fru64_with_point(),
        (y, q) in fru64_with_point(),
    ) {
        let r = x.multiply(y);
        let exact = p as u128 * q as u128;
        prop_assert!(((r.lower() as u128) << 64) <= exact);
        prop_assert!(exact < ((r.upper() as u128 + 1) << 64) || r.upper() == u64::MAX);
    }

    #[test]
    fn add_contains_point_sum(
        (x, p) in fru64_with_point(),
        (y, q) in fru64_with_point(),
    ) {
        let mut overflow = false;
        let r = x.add(y, &mut overflow);
        let exact = p as u128 + q as u128;
        if !overflow {
            prop_assert!(r.lower() as u128 <= exact && exact <= r.upper() as u128);
        } else {
            prop_assert_eq!(r.upper(), u64::MAX);
        }
    }

    #[test]
    fn subtract_contains_point_difference(
        (x, p) in fru64_with_point(),
        (y, q) in fru64_with_point(),
    ) {
        let mut overflow = false;
        let r = x.subtract(y, &mut overflow);
        if !overflow {
            // true difference spans (p - q - 1, p - q + 1) in ulps
            prop_assert!(p >= q);
            prop_assert!(r.lower() <= p - q && p - q <= r.upper());
        }
    }

    #[test]
    fn divide_contains_point_quotient(
        (x, p) in fru64_with_point(),
        (y, q) in fru64_with_point(),
    ) {
        prop_assume!(q > 0 && p < q);
        let mut overflow = false;
        let r = x.divide(y, &mut overflow);
        let scaled = (p as u128) << 64;
        prop_assert!(r.lower() as u128 * q as u128 <= scaled);
        if let Some(bound) = (r.upper() as u128 + 1).checked_mul(q as u128) {
            prop_assert!(scaled < bound);
        }
    }

    #[test]
    fn wide_multiply_is_contained_by_narrow(
        (x, _) in fru64_with_point(),
        (y, _) in fru64_with_point(),
    ) {
        let narrow = x.multiply(y).widen();
        let wide = x.widen().multiply(y.widen());
        prop_assert!(narrow.contains(&wide));
    }

    #[test]
    fn reciprocal_matches_divide(a in 1u128..=u128::MAX, b in 1u128..=u128::MAX) {
        let (num, den) = if a < b { (a, b) } else { (b, a) };
        prop_assume!(num < den);
        let mut overflow = false;
        let y = Fru128::fractoid(num);
        let x = Fru128::fractoid(den);
        let via_reciprocal = Reciprocal::new(x, &mut overflow).apply(y, &mut overflow);
        let via_divide = y.divide(x, &mut overflow);
        prop_assert!(via_reciprocal.overlaps(&via_divide));
    }

    #[test]
    fn not_is_an_involution(a in any::<u128>(), b in any::<u128>()) {
        let x = Fru128::new(a, b);
        prop_assert_eq!(x.not().not(), x);
    }
}
