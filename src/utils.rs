//! Utility functions and types used accross the library
use crate::Scalar;

/// Restrict value to a certain interval
///
/// Unlike `f64::clamp` this never panics and maps `NaN` to `min`.
#[inline]
pub fn clamp<T>(val: T, min: T, max: T) -> T
where
    T: PartialOrd,
{
    if val > max {
        max
    } else if val >= min {
        val
    } else {
        min
    }
}

/// Convert unit interval value into `u8` channel with rounding
#[inline]
pub(crate) fn unit_to_u8(value: Scalar) -> u8 {
    (clamp(value, 0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Mix `src` over `dst` channel with weight `t` in `[0, 1]`
#[inline]
pub(crate) fn mix_u8(dst: u8, src: u8, t: Scalar) -> u8 {
    let value = dst as Scalar + (src as Scalar - dst as Scalar) * t;
    (value + 0.5) as u8
}
