//! Units and file settings
//!
//! Handles the unit system, coordinate format, zero suppression and
//! notation of a fabrication layer, plus inch/metric value conversion.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Convert a length in millimeters to inches.
#[inline]
pub fn inch(value_mm: f64) -> f64 {
    value_mm / MM_PER_INCH
}

/// Convert a length in inches to millimeters.
#[inline]
pub fn metric(value_inch: f64) -> f64 {
    value_inch * MM_PER_INCH
}

/// Unit system of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters
    Metric,
    /// Inches
    Inch,
}

impl Default for Units {
    fn default() -> Self {
        Self::Metric
    }
}

impl Units {
    /// Factor that converts a length in `self` into `target` units.
    pub fn factor_to(self, target: Units) -> f64 {
        match (self, target) {
            (Units::Metric, Units::Inch) => 1.0 / MM_PER_INCH,
            (Units::Inch, Units::Metric) => MM_PER_INCH,
            _ => 1.0,
        }
    }

    /// Convert a length expressed in `self` into `target` units.
    pub fn convert(self, value: f64, target: Units) -> f64 {
        value * self.factor_to(target)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "metric"),
            Self::Inch => write!(f, "inch"),
        }
    }
}

impl FromStr for Units {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "mm" => Ok(Self::Metric),
            "inch" | "in" | "imperial" => Ok(Self::Inch),
            _ => Err(CoreError::UnknownUnits(s.to_string())),
        }
    }
}

/// Which zeros are omitted when a coordinate is encoded as an integer string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroSuppression {
    /// Leading zeros are omitted (`0012300` -> `12300`)
    Leading,
    /// Trailing zeros are omitted (`0012300` -> `00123`)
    Trailing,
}

impl Default for ZeroSuppression {
    fn default() -> Self {
        Self::Leading
    }
}

impl fmt::Display for ZeroSuppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leading => write!(f, "leading"),
            Self::Trailing => write!(f, "trailing"),
        }
    }
}

impl FromStr for ZeroSuppression {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leading" | "l" => Ok(Self::Leading),
            "trailing" | "t" => Ok(Self::Trailing),
            _ => Err(CoreError::UnknownZeroSuppression(s.to_string())),
        }
    }
}

/// Coordinate notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    /// Coordinates are absolute positions
    Absolute,
    /// Coordinates are deltas from the previous position
    Incremental,
}

impl Default for Notation {
    fn default() -> Self {
        Self::Absolute
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

impl FromStr for Notation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absolute" | "abs" => Ok(Self::Absolute),
            "incremental" | "inc" => Ok(Self::Incremental),
            _ => Err(CoreError::UnknownNotation(s.to_string())),
        }
    }
}

/// Number of integer and decimal digits of encoded coordinates.
///
/// Construction validates the digit counts so that encoding never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u8, u8)", into = "(u8, u8)")]
pub struct CoordinateFormat {
    integer: u8,
    decimal: u8,
}

impl CoordinateFormat {
    pub const MAX_INTEGER_DIGITS: u8 = 6;
    pub const MAX_DECIMAL_DIGITS: u8 = 7;
    pub const MAX_TOTAL_DIGITS: u8 = 13;

    /// Format used for metric DXF-derived layers.
    pub const METRIC_DEFAULT: CoordinateFormat = CoordinateFormat {
        integer: 3,
        decimal: 4,
    };

    /// Format used for inch DXF-derived layers.
    pub const INCH_DEFAULT: CoordinateFormat = CoordinateFormat {
        integer: 2,
        decimal: 5,
    };

    pub fn new(integer: u8, decimal: u8) -> CoreResult<Self> {
        if integer > Self::MAX_INTEGER_DIGITS
            || decimal > Self::MAX_DECIMAL_DIGITS
            || integer + decimal > Self::MAX_TOTAL_DIGITS
        {
            return Err(CoreError::InvalidFormat { integer, decimal });
        }
        Ok(Self { integer, decimal })
    }

    /// Default format for the given units.
    pub fn for_units(units: Units) -> Self {
        match units {
            Units::Metric => Self::METRIC_DEFAULT,
            Units::Inch => Self::INCH_DEFAULT,
        }
    }

    #[inline]
    pub fn integer(self) -> u8 {
        self.integer
    }

    #[inline]
    pub fn decimal(self) -> u8 {
        self.decimal
    }

    #[inline]
    pub fn total_digits(self) -> u8 {
        self.integer + self.decimal
    }
}

impl TryFrom<(u8, u8)> for CoordinateFormat {
    type Error = CoreError;

    fn try_from((integer, decimal): (u8, u8)) -> Result<Self, Self::Error> {
        Self::new(integer, decimal)
    }
}

impl From<CoordinateFormat> for (u8, u8) {
    fn from(format: CoordinateFormat) -> Self {
        (format.integer, format.decimal)
    }
}

impl fmt::Display for CoordinateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.integer, self.decimal)
    }
}

/// Settings shared by all coordinates of a layer file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    pub units: Units,
    pub format: CoordinateFormat,
    pub zero_suppression: ZeroSuppression,
    pub notation: Notation,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self::for_units(Units::Metric)
    }
}

impl FileSettings {
    pub fn new(
        units: Units,
        format: CoordinateFormat,
        zero_suppression: ZeroSuppression,
        notation: Notation,
    ) -> Self {
        Self {
            units,
            format,
            zero_suppression,
            notation,
        }
    }

    /// Absolute, leading-zero-suppressed settings with the default format of `units`.
    pub fn for_units(units: Units) -> Self {
        Self {
            units,
            format: CoordinateFormat::for_units(units),
            zero_suppression: ZeroSuppression::Leading,
            notation: Notation::Absolute,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.notation == Notation::Absolute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_metric_conversion() {
        assert!((metric(1.0) - 25.4).abs() < 1e-12);
        assert!((inch(25.4) - 1.0).abs() < 1e-12);
        assert!((Units::Inch.convert(2.0, Units::Metric) - 50.8).abs() < 1e-12);
        assert_eq!(Units::Metric.convert(3.0, Units::Metric), 3.0);
    }

    #[test]
    fn test_units_from_str() {
        assert_eq!("mm".parse::<Units>(), Ok(Units::Metric));
        assert_eq!("INCH".parse::<Units>(), Ok(Units::Inch));
        assert!("parsec".parse::<Units>().is_err());
        assert_eq!("t".parse::<ZeroSuppression>(), Ok(ZeroSuppression::Trailing));
        assert_eq!("abs".parse::<Notation>(), Ok(Notation::Absolute));
    }

    #[test]
    fn test_coordinate_format_limits() {
        assert!(CoordinateFormat::new(6, 7).is_ok());
        assert!(CoordinateFormat::new(7, 4).is_err());
        assert!(CoordinateFormat::new(2, 8).is_err());
        assert_eq!(CoordinateFormat::for_units(Units::Inch).to_string(), "2.5");
    }

    #[test]
    fn test_coordinate_format_serde_validates() {
        let ok: CoordinateFormat = serde_json::from_str("[3, 4]").unwrap();
        assert_eq!(ok, CoordinateFormat::METRIC_DEFAULT);
        assert!(serde_json::from_str::<CoordinateFormat>("[9, 4]").is_err());
    }

    #[test]
    fn test_default_file_settings() {
        let settings = FileSettings::for_units(Units::Inch);
        assert_eq!(settings.format, CoordinateFormat::INCH_DEFAULT);
        assert_eq!(settings.zero_suppression, ZeroSuppression::Leading);
        assert!(settings.is_absolute());
    }
}
