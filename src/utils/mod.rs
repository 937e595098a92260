pub mod time;

pub use self::time::*;

pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// `multiply` scales an integer by a rate, rounding half up to the nearest integer.
/// The result saturates at the bounds of `i32`.
#[inline]
pub fn multiply(value: i32, rate: f64) -> i32 {
    let product = (value as f64 * rate).round();
    if product >= i32::MAX as f64 {
        i32::MAX
    } else if product <= i32::MIN as f64 {
        i32::MIN
    } else {
        product as i32
    }
}

/// `divide` returns `dividend / divisor`, or 0 when the divisor is 0.
#[inline]
pub fn divide(dividend: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        0.0
    } else {
        dividend / divisor
    }
}
