//! Generic helper functions shared by the cost model crates.
#[macro_use]
pub mod unwrap;

use num::Integer;

/// Performs an integer divison rounded to the upper number.
pub fn div_ceil<T: Integer + Copy>(lhs: T, rhs: T) -> T {
    let (quo, rem) = lhs.div_rem(&rhs);
    if rem == T::zero() {
        quo
    } else {
        quo + T::one()
    }
}

/// Returns the log2 of a power of 2.
pub fn log2_u32(x: u32) -> Option<u32> {
    if x.count_ones() == 1 {
        Some(x.trailing_zeros())
    } else {
        None
    }
}

/// Returns `numer / denom` as a fraction, saturating to 1 when the denominator is zero.
pub fn ratio(numer: u64, denom: u64) -> f64 {
    if denom == 0 {
        1.0
    } else {
        numer as f64 / denom as f64
    }
}
