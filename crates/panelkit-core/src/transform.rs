//! Transform traits threaded through primitives, apertures and layers.

use crate::point::Point;
use crate::units::Units;

/// Geometric transforms applied in place.
///
/// `rotate` turns absolute coordinates about `center`; implementors that
/// carry relative offsets must re-derive them rather than rotating the
/// offsets as absolute points.
pub trait Transform {
    /// Translate every coordinate-bearing field. Angles are untouched.
    fn offset(&mut self, dx: f64, dy: f64);

    /// Rotate counter-clockwise by `angle` degrees about `center`.
    fn rotate(&mut self, angle: f64, center: Point);

    /// Multiply every length-valued field by `factor`.
    fn scale(&mut self, factor: f64);
}

/// Unit conversion of a whole layer, guarded by its units flag.
///
/// Calling `to_inch` on an inch layer (or `to_metric` on a metric one)
/// is a no-op, so conversions are idempotent.
pub trait UnitConversion {
    fn units(&self) -> Units;

    fn to_inch(&mut self);

    fn to_metric(&mut self);

    /// Convert to `units` by dispatching to `to_inch` or `to_metric`.
    fn convert_to(&mut self, units: Units) {
        match units {
            Units::Inch => self.to_inch(),
            Units::Metric => self.to_metric(),
        }
    }
}
