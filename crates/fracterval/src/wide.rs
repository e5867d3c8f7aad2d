//! 256-bit Helpers
//!
//! Products and quotients of 128-bit mantissas need one extra word. These
//! helpers work on `(high, low)` pairs of `u128`.

const LOW_MASK: u128 = u64::MAX as u128;

/// Full product `a * b` as `(high, low)`.
#[inline]
pub(crate) fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LOW_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LOW_MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let (mid, mid_carry) = lh.overflowing_add(hl);
    let (lo, lo_carry) = ll.overflowing_add(mid << 64);
    let hi = hh + (mid >> 64) + ((mid_carry as u128) << 64) + lo_carry as u128;
    (hi, lo)
}

/// Adds a 128-bit value to a 256-bit value. The caller guarantees no carry
/// out of the high word.
#[inline]
pub(crate) fn add_wide(hi: u128, lo: u128, addend: u128) -> (u128, u128) {
    let (lo, carry) = lo.overflowing_add(addend);
    (hi + carry as u128, lo)
}

/// High word of `a * b + a + b`, which is `ceil((a+1)(b+1) / 2^128) - 1`.
///
/// The sum never exceeds `2^256 - 1`, so no carry is lost.
#[inline]
pub(crate) fn mul_upper(a: u128, b: u128) -> u128 {
    let (hi, lo) = mul_wide(a, b);
    let (hi, lo) = add_wide(hi, lo, a);
    let (hi, _) = add_wide(hi, lo, b);
    hi
}

/// Divides `(hi, lo)` by `d`.
///
/// Returns the quotient and whether a nonzero remainder was left, or `None`
/// when `d` is zero or the quotient does not fit in 128 bits.
pub(crate) fn div_wide(hi: u128, lo: u128, d: u128) -> Option<(u128, bool)> {
    if d == 0 || hi >= d {
        return None;
    }
    if hi == 0 {
        return Some((lo / d, lo % d != 0));
    }

    // Restoring long division; `rem < d` holds at the top of every step.
    let mut rem = hi;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some((quotient, rem != 0))
}
