//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    value.max(min).min(max)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Due to floating point round-off the result can equal `rhs.abs()` when `lhs` is a very small
/// negative number, callers wanting a half-open range must check for this.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle in degrees into the range `[0, 360)`.
pub fn wrap_deg(value: f64) -> f64 {
    let r = rem_euclid(value, 360.0);

    if r >= 360.0 { 0.0 } else { r }
}

/// Get the unsigned shortest angular distance between two angles in degrees.
///
/// The result is in `[0, 180]` and accounts for wrapping, so 359 and 1 are 2 degrees apart.
pub fn ang_dist_deg(a: f64, b: f64) -> f64 {
    (rem_euclid(a - b + 180.0, 360.0) - 180.0).abs()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_deg() {
        assert_eq!(wrap_deg(0f64), 0f64);
        assert_eq!(wrap_deg(360f64), 0f64);
        assert_eq!(wrap_deg(-90f64), 270f64);
        assert_eq!(wrap_deg(725f64), 5f64);
        assert!(wrap_deg(-1e-20f64) < 360f64);
    }

    #[test]
    fn test_ang_dist_deg() {
        assert_eq!(ang_dist_deg(1f64, 359f64), 2f64);
        assert_eq!(ang_dist_deg(359f64, 1f64), 2f64);
        assert_eq!(ang_dist_deg(90f64, 93f64), 3f64);
        assert_eq!(ang_dist_deg(0f64, 180f64), 180f64);
        assert_eq!(ang_dist_deg(10f64, 10f64), 0f64);
    }

    #[test]
    fn test_map_and_clamp() {
        assert_eq!(lin_map((0f64, 100.0), (0.0, 255.0), 100.0), 255.0);
        assert_eq!(clamp(300f64, 0.0, 255.0), 255.0);
        assert_eq!(clamp(-3f64, 0.0, 255.0), 0.0);
    }
}
