//! Tolerance-aware equality
//!
//! Every stitching and merge-matching decision routes through these
//! predicates; exact float equality is never used for geometry.

use crate::point::Point;

/// Default matching tolerance, in the native units of the layer it applies to.
pub const DEFAULT_ERROR_RANGE: f64 = 0.001;

/// `true` when `(a - b)^2 <= error_range^2`.
#[inline]
pub fn is_equal_value(a: f64, b: f64, error_range: f64) -> bool {
    let d = a - b;
    d * d <= error_range * error_range
}

/// Per-axis [`is_equal_value`] joined with logical AND.
#[inline]
pub fn is_equal_point(a: Point, b: Point, error_range: f64) -> bool {
    is_equal_value(a.x, b.x, error_range) && is_equal_value(a.y, b.y, error_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_equal_value() {
        assert!(is_equal_value(1.0, 1.0005, 0.001));
        assert!(is_equal_value(1.0, 1.001, 0.001));
        assert!(!is_equal_value(1.0, 1.002, 0.001));
        assert!(is_equal_value(-3.0, -3.0, 0.0));
    }

    #[test]
    fn test_is_equal_point_requires_both_axes() {
        let a = Point::new(0.0, 0.0);
        assert!(is_equal_point(a, Point::new(0.0005, -0.0005), 0.001));
        assert!(!is_equal_point(a, Point::new(0.0005, 0.01), 0.001));
        assert!(!is_equal_point(a, Point::new(0.01, 0.0), 0.001));
    }
}
