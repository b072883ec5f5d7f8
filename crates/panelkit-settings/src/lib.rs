//! PanelKit Settings Crate
//!
//! Handles the panel configuration file: tolerance, DXF rendering defaults
//! and output formats.

pub mod config;
pub mod error;

pub use config::{DxfOptions, DxfSettings, OutputSettings, PanelConfig, ToleranceSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
