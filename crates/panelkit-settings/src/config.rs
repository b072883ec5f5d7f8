//! Panel configuration
//!
//! Provides the configuration file read by panel builds, its validation,
//! and helpers that turn configured millimetre values into the native
//! units of a layer.
//!
//! Configuration is organized into sections:
//! - Tolerance (geometric matching error range)
//! - DXF rendering defaults (draw mode, dot pitch, groove width)
//! - Output (panel units and coordinate formats)

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use panelkit_compose::{DrawMode, DrillComposition, DxfSource};
use panelkit_core::{
    inch, CoordinateFormat, FileSettings, Notation, UnitConversion, Units, ZeroSuppression,
    DEFAULT_ERROR_RANGE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Geometric matching settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceSettings {
    /// Maximum distance at which two values count as equal, in the units
    /// of the layer it is applied to
    pub error_range: f64,
}

impl Default for ToleranceSettings {
    fn default() -> Self {
        Self {
            error_range: DEFAULT_ERROR_RANGE,
        }
    }
}

/// Defaults applied to DXF-derived layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DxfSettings {
    /// How stitched outlines are rendered
    pub draw_mode: DrawMode,
    /// Mouse-bite dot spacing in millimetres
    pub pitch_mm: f64,
    /// Aperture diameter or groove tool width in millimetres
    pub width_mm: f64,
    /// Zero suppression of encoded coordinates
    pub zero_suppression: ZeroSuppression,
}

impl Default for DxfSettings {
    fn default() -> Self {
        Self {
            draw_mode: DrawMode::Line,
            pitch_mm: 1.0,
            width_mm: 0.5,
            zero_suppression: ZeroSuppression::Leading,
        }
    }
}

/// Output file settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Units of the composed panel files
    pub units: Units,
    /// Coordinate format used when the panel is metric
    pub metric_format: CoordinateFormat,
    /// Coordinate format used when the panel is in inches
    pub inch_format: CoordinateFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            metric_format: CoordinateFormat::METRIC_DEFAULT,
            inch_format: CoordinateFormat::INCH_DEFAULT,
        }
    }
}

/// DXF options expressed in the native units of one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DxfOptions {
    pub draw_mode: DrawMode,
    pub pitch: f64,
    pub width: f64,
}

/// Complete panel configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PanelConfig {
    /// Tolerance settings
    pub tolerance: ToleranceSettings,
    /// DXF defaults
    pub dxf: DxfSettings,
    /// Output settings
    pub output: OutputSettings,
}

impl PanelConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into())
            }
        };

        config.validate()?;
        info!(path = %path.display(), "Loaded panel config");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| SettingsError::SaveError(e.to_string()))?
            }
            other => {
                return Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into())
            }
        };

        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Saved panel config");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_positive(self.tolerance.error_range) {
            return Err(out_of_range("tolerance.error_range", self.tolerance.error_range));
        }
        if !is_positive(self.dxf.pitch_mm) {
            return Err(out_of_range("dxf.pitch_mm", self.dxf.pitch_mm));
        }
        if !(is_positive(self.dxf.width_mm) || self.dxf.width_mm == 0.0) {
            return Err(out_of_range("dxf.width_mm", self.dxf.width_mm));
        }
        Ok(())
    }

    /// DXF pitch and width converted to `units`.
    pub fn dxf_options(&self, units: Units) -> DxfOptions {
        let native = |mm: f64| match units {
            Units::Metric => mm,
            Units::Inch => inch(mm),
        };
        DxfOptions {
            draw_mode: self.dxf.draw_mode,
            pitch: native(self.dxf.pitch_mm),
            width: native(self.dxf.width_mm),
        }
    }

    /// Apply the DXF defaults to a loaded layer, in that layer's units.
    pub fn apply_to(&self, source: &mut DxfSource) {
        let options = self.dxf_options(source.units());
        source.set_draw_mode(options.draw_mode);
        source.set_pitch(options.pitch);
        source.set_width(options.width);
        source.settings.zero_suppression = self.dxf.zero_suppression;
    }

    /// Absolute settings of the composed panel files.
    pub fn output_settings(&self) -> FileSettings {
        let format = match self.output.units {
            Units::Metric => self.output.metric_format,
            Units::Inch => self.output.inch_format,
        };
        FileSettings::new(
            self.output.units,
            format,
            ZeroSuppression::Leading,
            Notation::Absolute,
        )
    }

    /// Empty drill composition matching tools within the configured tolerance.
    pub fn drill_composition(&self) -> DrillComposition {
        DrillComposition::with_error_range(self.tolerance.error_range)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn is_positive(value: f64) -> bool {
    value > 0.0
}

fn out_of_range(key: &str, value: f64) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}
