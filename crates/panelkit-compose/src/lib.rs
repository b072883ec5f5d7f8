//! # PanelKit Compose
//!
//! Layer models and the compositions that merge them into panel files.
//!
//! ## Sources
//! - [`gerber`]: Gerber statements, aperture generalization and rotation
//! - [`aperture`]: aperture definitions and macros
//! - [`excellon`]: drill tools, hits, slots and routs
//! - [`dxf`]: stitched DXF outlines rendered as lines, fills or mouse bites
//!
//! ## Compositions
//! - [`GerberComposition`] merges Gerber and DXF layers
//! - [`DrillComposition`] merges Excellon and DXF layers

pub mod aperture;
pub mod drill_composition;
pub mod dxf;
pub mod error;
pub mod excellon;
pub mod gerber;
pub mod gerber_composition;
pub mod source;

pub use aperture::{ApertureDefinition, ApertureMacro, ApertureShape, MacroContent, MacroValue};
pub use drill_composition::DrillComposition;
pub use crate::dxf::{DrawMode, DxfSource, FileType};
pub use error::{ComposeError, ComposeResult};
pub use excellon::{
    DrillFeature, DrillTool, ExcellonSource, ExcellonStatement, RoutMode, RoutNode,
};
pub use gerber::{
    CoordStatement, DOperation, GerberSource, GerberStatement, Interpolation, ParamStatement,
    Polarity,
};
pub use gerber_composition::{GerberComposition, APERTURE_ID_BIAS};
pub use source::Source;
