//! Fixed-point math utilities
//!
//! All pool arithmetic runs on `i128` values scaled by the pool precision.
//! Helpers return [`Invariant`] errors instead of panicking so overflow and
//! zero divisors surface as fatal conditions the caller can abort on.

use crate::error::Invariant;

/// Fixed-point precision (6 decimals)
pub const PRECISION_DECIMALS: u32 = 6;
pub const PRECISION: i128 = 1_000_000;

/// Checked multiply
#[inline]
pub fn mul(a: i128, b: i128) -> Result<i128, Invariant> {
    a.checked_mul(b).ok_or(Invariant::Overflow)
}

/// Divide, rounding toward zero
#[inline]
pub fn floor_div(numerator: i128, denominator: i128) -> Result<i128, Invariant> {
    if denominator == 0 {
        return Err(Invariant::DivisionByZero);
    }
    Ok(numerator / denominator)
}

/// Divide, rounding away from zero
#[inline]
pub fn ceil_div(numerator: i128, denominator: i128) -> Result<i128, Invariant> {
    if denominator == 0 {
        return Err(Invariant::DivisionByZero);
    }
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder != 0 && (numerator < 0) == (denominator < 0) {
        Ok(quotient + 1)
    } else {
        Ok(quotient)
    }
}

/// `a * b / d`, floored
#[inline]
pub fn mul_div_floor(a: i128, b: i128, d: i128) -> Result<i128, Invariant> {
    floor_div(mul(a, b)?, d)
}

/// `a * b / d`, rounded up
#[inline]
pub fn mul_div_ceil(a: i128, b: i128, d: i128) -> Result<i128, Invariant> {
    ceil_div(mul(a, b)?, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_and_ceil_bracket_exact_division() {
        assert_eq!(floor_div(7, 2).unwrap(), 3);
        assert_eq!(ceil_div(7, 2).unwrap(), 4);
        assert_eq!(floor_div(8, 2).unwrap(), 4);
        assert_eq!(ceil_div(8, 2).unwrap(), 4);
    }

    #[test]
    fn zero_divisor_is_fatal() {
        assert_eq!(floor_div(1, 0), Err(Invariant::DivisionByZero));
        assert_eq!(ceil_div(1, 0), Err(Invariant::DivisionByZero));
    }

    #[test]
    fn overflow_is_fatal() {
        assert_eq!(mul(i128::MAX, 2), Err(Invariant::Overflow));
        assert_eq!(mul_div_floor(i128::MAX, 2, 2), Err(Invariant::Overflow));
    }

    #[test]
    fn mul_div_rounds_in_the_requested_direction() {
        // 10 * 3 / 4 = 7.5
        assert_eq!(mul_div_floor(10, 3, 4).unwrap(), 7);
        assert_eq!(mul_div_ceil(10, 3, 4).unwrap(), 8);
    }
}
