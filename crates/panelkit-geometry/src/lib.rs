//! # PanelKit Geometry
//!
//! Reconstructs continuous contours from fragmented CAD entities.
//!
//! - [`primitive`]: the uniform [`GraphicPrimitive`] built from [`CadEntity`] records
//! - [`path`]: connected primitive runs and their endpoint merge rules
//! - [`stitch`]: grouping of primitives into closed and open paths
//! - [`dots`]: evenly spaced points along a path

pub mod dots;
pub mod path;
pub mod primitive;
pub mod stitch;

pub use dots::{generate_dots, generate_dots_for};
pub use path::Path;
pub use primitive::{Arc, CadEntity, Circle, GraphicPrimitive, Line, PolylineVertex};
pub use stitch::{stitch, stitch_primitives, StitchResult};
