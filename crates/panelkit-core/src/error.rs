//! Error types for the core crate.
//!
//! This module provides structured error types for file settings
//! validation and the parsing of setting keywords.

use thiserror::Error;

/// Errors raised while building or parsing file settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Coordinate format digit counts are outside the encodable range.
    #[error("Invalid coordinate format {integer}.{decimal} (max 6 integer, 7 decimal, 13 total digits)")]
    InvalidFormat {
        /// Number of integer digits.
        integer: u8,
        /// Number of decimal digits.
        decimal: u8,
    },

    /// The units keyword is not recognized.
    #[error("Unknown units: {0}")]
    UnknownUnits(String),

    /// The zero suppression keyword is not recognized.
    #[error("Unknown zero suppression: {0}")]
    UnknownZeroSuppression(String),

    /// The coordinate notation keyword is not recognized.
    #[error("Unknown notation: {0}")]
    UnknownNotation(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_display() {
        let err = CoreError::InvalidFormat {
            integer: 7,
            decimal: 4,
        };
        assert_eq!(
            err.to_string(),
            "Invalid coordinate format 7.4 (max 6 integer, 7 decimal, 13 total digits)"
        );

        let err = CoreError::UnknownUnits("furlong".to_string());
        assert_eq!(err.to_string(), "Unknown units: furlong");

        let err = CoreError::UnknownNotation("relative".to_string());
        assert_eq!(err.to_string(), "Unknown notation: relative");
    }
}
