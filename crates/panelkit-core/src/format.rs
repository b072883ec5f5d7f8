//! Text encoding of coordinate values
//!
//! Gerber and Excellon encode coordinates as integer strings with an
//! implied decimal point whose position is given by the file format.

use crate::units::{CoordinateFormat, FileSettings, ZeroSuppression};

/// Encode `value` as a fixed-point digit string.
///
/// The value is scaled by `10^decimal`, rounded, zero padded to the total
/// digit count and then stripped of the suppressed zeros. Zero encodes as `0`.
pub fn format_coordinate(value: f64, format: CoordinateFormat, zeros: ZeroSuppression) -> String {
    let negative = value < 0.0;
    let scaled = (value.abs() * 10f64.powi(i32::from(format.decimal()))).round() as u64;
    if scaled == 0 {
        return "0".to_string();
    }

    let width = usize::from(format.total_digits());
    let digits = format!("{:0width$}", scaled, width = width);
    let trimmed = match zeros {
        ZeroSuppression::Leading => digits.trim_start_matches('0'),
        ZeroSuppression::Trailing => digits.trim_end_matches('0'),
    };

    if negative {
        format!("-{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Encode `value` using the format and zero suppression of `settings`.
pub fn format_with(value: f64, settings: &FileSettings) -> String {
    format_coordinate(value, settings.format, settings.zero_suppression)
}

/// Render a size (aperture modifier, tool diameter) with a fixed number of decimals.
pub fn format_decimal(value: f64, digits: u8) -> String {
    format!("{:.*}", usize::from(digits), value)
}

/// Render a free-form number with at most six decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
