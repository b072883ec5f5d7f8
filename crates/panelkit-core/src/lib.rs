//! # PanelKit Core
//!
//! Core types shared by every PanelKit crate:
//! units and file settings of fabrication layers, the text encoding of
//! coordinates, the tolerance predicate used by all geometric matching,
//! and the transform traits that offset, rotate and rescale layers.

pub mod error;
pub mod format;
pub mod point;
pub mod tolerance;
pub mod transform;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use format::{format_coordinate, format_decimal, format_number, format_with};
pub use point::{rotate_point, Point};
pub use tolerance::{is_equal_point, is_equal_value, DEFAULT_ERROR_RANGE};
pub use transform::{Transform, UnitConversion};
pub use units::{
    inch, metric, CoordinateFormat, FileSettings, Notation, Units, ZeroSuppression, MM_PER_INCH,
};
