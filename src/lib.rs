//! # PanelKit
//!
//! Panelization of printed-circuit-board fabrication layers:
//! - Gerber layers merged with renumbered apertures and renamed macros
//! - Excellon drill files merged with tools shared by diameter
//! - DXF outlines stitched into paths and rendered as lines, fills or mouse bites
//! - Offset, rotation and unit conversion of every layer kind
//!
//! ## Architecture
//!
//! PanelKit is organized as a workspace with multiple crates:
//!
//! 1. **panelkit-core** - Units, file settings, coordinate encoding, tolerance, transforms
//! 2. **panelkit-geometry** - Primitive adapter, path stitcher, dot generator
//! 3. **panelkit-compose** - Layer models, Gerber and drill compositions
//! 4. **panelkit-settings** - Panel configuration files
//! 5. **panelkit** - Facade that re-exports the crates above

pub use panelkit_compose as compose;
pub use panelkit_core as core;
pub use panelkit_geometry as geometry;
pub use panelkit_settings as settings;

pub use panelkit_compose::{
    ComposeError, ComposeResult, DrawMode, DrillComposition, DxfSource, ExcellonSource, FileType,
    GerberComposition, GerberSource, Source,
};
pub use panelkit_core::{FileSettings, Point, Transform, UnitConversion, Units};
pub use panelkit_geometry::{generate_dots, stitch, CadEntity, GraphicPrimitive, Path};
pub use panelkit_settings::{PanelConfig, SettingsError};

/// Initialize logging with tracing
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
