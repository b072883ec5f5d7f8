//! Error types for the compose crate.
//!
//! Every failure aborts the current merge or write; there is no partial
//! success.

use panelkit_core::CoreError;
use std::io;
use thiserror::Error;

/// Errors raised while merging sources or writing compositions.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The source variant cannot be merged into this composition.
    #[error("Unsupported source for {composition} composition: {source_kind}")]
    UnsupportedSource {
        composition: &'static str,
        source_kind: &'static str,
    },

    /// Coordinates must be absolute to be merged or written.
    #[error("Coordinate notation must be absolute: {0}")]
    NonAbsoluteNotation(String),

    /// An aperture definition references a macro that was never defined.
    #[error("Unknown aperture macro: {0}")]
    UnknownMacro(String),

    /// A select statement references an aperture that was never defined.
    #[error("Unknown aperture: D{0}")]
    UnknownAperture(u32),

    /// A drill feature references a tool missing from the tool table.
    #[error("Unknown tool: T{0:02}")]
    UnknownTool(u32),

    /// An aperture macro body could not be read.
    #[error("Invalid aperture macro '{name}': {reason}")]
    InvalidMacro { name: String, reason: String },

    /// Nothing has been merged yet.
    #[error("Composition is empty")]
    EmptyComposition,

    /// The DXF drawing could not be loaded.
    #[error("DXF error: {0}")]
    Dxf(String),

    /// I/O error while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Formatting error while rendering output.
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Error from file settings.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for compose operations.
pub type ComposeResult<T> = Result<T, ComposeError>;
