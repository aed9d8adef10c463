//! Portable overflow observation.
//!
//! The operation wraps, and the overflow flag is recomputed from the operands
//! and the wrapped result exactly as the processor would set OF. No wider
//! accumulator is involved.
//!
//! The predicates carry Verus contracts tying the flag to the mathematical
//! result. The bodies use bitwise sign tests and `wrapping_div`, which the
//! verifier does not interpret, so the functions are `external_body`: their
//! contracts are trusted, not proven, and are checked by the tests below
//! against `overflowing_*`. Under cargo the `verus!` macro strips them.

use verus_builtin_macros::verus;

use super::ArithOp;

verus! {

/// Ghost predicate: does `x` fit in an `i32`?
pub open spec fn spec_fits_i32(x: int) -> bool {
    i32::MIN as int <= x && x <= i32::MAX as int
}

/// `a + b` with the signed-overflow flag.
///
/// Overflow iff both operands share a sign and the result does not.
#[verifier::external_body]
pub fn add_overflows(a: i32, b: i32) -> (r: (i32, bool))
    ensures
        r.1 == !spec_fits_i32(a as int + b as int),
        !r.1 ==> r.0 as int == a as int + b as int,
{
    let value = a.wrapping_add(b);
    (value, ((a ^ value) & (b ^ value)) < 0)
}

/// `a - b` with the signed-overflow flag.
///
/// Overflow iff the operands differ in sign and the result's sign differs
/// from the minuend.
#[verifier::external_body]
pub fn sub_overflows(a: i32, b: i32) -> (r: (i32, bool))
    ensures
        r.1 == !spec_fits_i32(a as int - b as int),
        !r.1 ==> r.0 as int == a as int - b as int,
{
    let value = a.wrapping_sub(b);
    (value, ((a ^ b) & (a ^ value)) < 0)
}

/// `a * b` with the signed-overflow flag.
///
/// Without overflow the truncated product divides back to `b`. The one
/// product whose division itself wraps, `-1 * i32::MIN`, is checked
/// explicitly.
#[verifier::external_body]
pub fn mul_overflows(a: i32, b: i32) -> (r: (i32, bool))
    ensures
        r.1 == !spec_fits_i32(a as int * b as int),
        !r.1 ==> r.0 as int == a as int * b as int,
{
    let value = a.wrapping_mul(b);
    let overflowed = a != 0 && (value.wrapping_div(a) != b || (a == -1 && b == i32::MIN));
    (value, overflowed)
}

} // verus!

pub(super) fn execute(op: ArithOp, a: i32, b: i32) -> (i32, bool) {
    match op {
        ArithOp::Add => add_overflows(a, b),
        ArithOp::Sub => sub_overflows(a, b),
        ArithOp::Mul => mul_overflows(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sign_rule() {
        assert_eq!(add_overflows(i32::MAX, 1), (i32::MIN, true));
        assert_eq!(add_overflows(i32::MIN, -1), (i32::MAX, true));
        assert_eq!(add_overflows(i32::MAX, i32::MIN), (-1, false));
        assert_eq!(add_overflows(-100, -200), (-300, false));
    }

    #[test]
    fn test_sub_sign_rule() {
        assert_eq!(sub_overflows(i32::MIN, 1), (i32::MAX, true));
        assert_eq!(sub_overflows(i32::MAX, -1), (i32::MIN, true));
        assert_eq!(sub_overflows(-1, i32::MIN), (i32::MAX, false));
        assert_eq!(sub_overflows(500, 300), (200, false));
    }

    #[test]
    fn test_mul_quotient_rule() {
        assert_eq!(mul_overflows(100_000, 100_000), (1_410_065_408, true));
        assert_eq!(mul_overflows(-1, i32::MIN), (i32::MIN, true));
        assert_eq!(mul_overflows(i32::MIN, -1), (i32::MIN, true));
        assert_eq!(mul_overflows(0, i32::MIN), (0, false));
        assert_eq!(mul_overflows(-1, i32::MAX), (-i32::MAX, false));
        assert!(mul_overflows(46_341, 46_341).1);
        assert_eq!(mul_overflows(46_340, 46_340), (2_147_395_600, false));
    }

    #[test]
    fn test_flags_agree_with_overflowing_ops() {
        let samples = [i32::MIN, -7, -1, 0, 1, 3, 65_535, i32::MAX];
        for a in samples {
            for b in samples {
                assert_eq!(add_overflows(a, b), a.overflowing_add(b));
                assert_eq!(sub_overflows(a, b), a.overflowing_sub(b));
                assert_eq!(mul_overflows(a, b), a.overflowing_mul(b));
            }
        }
    }

    /// Runtime check of the `ensures` clauses the verifier takes on trust.
    #[test]
    fn test_trusted_contracts_hold() {
        let fits = |x: i64| i64::from(i32::MIN) <= x && x <= i64::from(i32::MAX);
        let samples = [
            i32::MIN, i32::MIN + 1, -65_536, -46_341, -46_340, -2, -1, 0, 1, 2, 46_340, 46_341,
            65_536, i32::MAX - 1, i32::MAX,
        ];
        for a in samples {
            for b in samples {
                let (wide_a, wide_b) = (i64::from(a), i64::from(b));
                let cases = [
                    (add_overflows(a, b), wide_a + wide_b),
                    (sub_overflows(a, b), wide_a - wide_b),
                    (mul_overflows(a, b), wide_a * wide_b),
                ];
                for ((value, overflowed), exact) in cases {
                    assert_eq!(overflowed, !fits(exact), "{a}, {b}");
                    if !overflowed {
                        assert_eq!(i64::from(value), exact, "{a}, {b}");
                    }
                }
            }
        }
    }
}
