//! Merging of drill files into one panel drill file.

use crate::dxf::DxfSource;
use crate::error::{ComposeError, ComposeResult};
use crate::excellon::{DrillFeature, DrillTool, ExcellonSource, ExcellonStatement};
use crate::source::Source;
use panelkit_core::{is_equal_value, FileSettings, UnitConversion, Units, DEFAULT_ERROR_RANGE};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

/// Drill files merged in caller order.
///
/// Tools of equal diameter (within the error range) are shared across
/// sources. Features keep their original order within each tool; DXF
/// layers are kept as separate blocks written after the Excellon features
/// of their tool.
#[derive(Debug, Clone)]
pub struct DrillComposition {
    settings: Option<FileSettings>,
    error_range: f64,
    preamble: Vec<ExcellonStatement>,
    postamble: Vec<ExcellonStatement>,
    tools: Vec<DrillTool>,
    features: Vec<DrillFeature>,
    blocks: Vec<(u32, Vec<DrillFeature>)>,
}

impl Default for DrillComposition {
    fn default() -> Self {
        Self::with_error_range(DEFAULT_ERROR_RANGE)
    }
}

impl DrillComposition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composition matching tool diameters within `error_range`, in the
    /// units of the first merged source.
    pub fn with_error_range(error_range: f64) -> Self {
        Self {
            settings: None,
            error_range,
            preamble: Vec::new(),
            postamble: Vec::new(),
            tools: Vec::new(),
            features: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn settings(&self) -> Option<&FileSettings> {
        self.settings.as_ref()
    }

    pub fn error_range(&self) -> f64 {
        self.error_range
    }

    pub fn tools(&self) -> &[DrillTool] {
        &self.tools
    }

    pub fn features(&self) -> &[DrillFeature] {
        &self.features
    }

    /// Hits on `tool`, DXF blocks included.
    pub fn hit_count(&self, tool: u32) -> usize {
        let block_hits = self
            .blocks
            .iter()
            .filter(|(number, _)| *number == tool)
            .flat_map(|(_, features)| features.iter())
            .filter(|f| f.is_hit())
            .count();
        self.features
            .iter()
            .filter(|f| f.is_hit() && f.tool() == tool)
            .count()
            + block_hits
    }

    /// Merge an Excellon or DXF layer.
    pub fn merge(&mut self, source: impl Into<Source>) -> ComposeResult<()> {
        match source.into() {
            Source::Excellon(file) => self.merge_excellon(file),
            Source::Dxf(file) => self.merge_dxf(file),
            other => Err(ComposeError::UnsupportedSource {
                composition: "drill",
                source_kind: other.kind(),
            }),
        }
    }

    /// Number of the tool matching `diameter`, adding one if none does.
    pub fn register_tool(&mut self, diameter: f64) -> u32 {
        if let Some(tool) = self
            .tools
            .iter()
            .find(|t| is_equal_value(t.diameter, diameter, self.error_range))
        {
            return tool.number;
        }
        let number = self.tools.iter().map(|t| t.number).max().unwrap_or(0) + 1;
        self.tools.push(DrillTool::new(number, diameter));
        debug!(tool = number, diameter, "Registered drill tool");
        number
    }

    fn capture_header(&mut self, statements: &[ExcellonStatement]) {
        let mut before_tools = true;
        for statement in statements {
            match statement {
                ExcellonStatement::ToolSelect(_) => break,
                ExcellonStatement::ToolDefinition(_) => before_tools = false,
                other if before_tools => self.preamble.push(other.clone()),
                other => self.postamble.push(other.clone()),
            }
        }
    }

    fn merge_excellon(&mut self, mut file: ExcellonSource) -> ComposeResult<()> {
        file.check_tools()?;
        match self.settings {
            Some(settings) => file.convert_to(settings.units),
            None => {
                self.settings = Some(file.settings);
                self.capture_header(&file.statements);
            }
        }

        let mapping: HashMap<u32, u32> = file
            .tools
            .values()
            .map(|tool| (tool.number, self.register_tool(tool.diameter)))
            .collect();
        let count = file.features.len();
        for mut feature in file.features {
            if let Some(number) = mapping.get(&feature.tool()) {
                feature.set_tool(*number);
            }
            self.features.push(feature);
        }
        debug!(tools = mapping.len(), features = count, "Merged Excellon layer");
        Ok(())
    }

    fn merge_dxf(&mut self, mut file: DxfSource) -> ComposeResult<()> {
        file.require_absolute()?;
        match self.settings {
            Some(settings) => file.convert_to(settings.units),
            None => {
                self.settings = Some(file.settings);
                let (preamble, postamble) = file.excellon_header();
                self.preamble = preamble;
                self.postamble = postamble;
            }
        }

        let tool = self.register_tool(file.width());
        let features = file.to_drill_features(tool);
        debug!(tool, features = features.len(), mode = ?file.draw_mode(), "Merged DXF layer");
        self.blocks.push((tool, features));
        Ok(())
    }

    /// Preamble, tool table, postamble, then each tool's features; ends with `M30`.
    pub fn render(&self) -> ComposeResult<String> {
        let settings = self.settings.ok_or(ComposeError::EmptyComposition)?;
        let mut out = String::new();
        for statement in &self.preamble {
            writeln!(out, "{}", statement.render(&settings))?;
        }
        for tool in &self.tools {
            writeln!(out, "{}", tool.render(&settings))?;
        }
        for statement in &self.postamble {
            writeln!(out, "{}", statement.render(&settings))?;
        }
        for tool in &self.tools {
            writeln!(out, "T{:02}", tool.number)?;
            for feature in self.features.iter().filter(|f| f.tool() == tool.number) {
                writeln!(out, "{}", feature.render(&settings))?;
            }
            for (_, features) in self.blocks.iter().filter(|(n, _)| *n == tool.number) {
                for feature in features {
                    writeln!(out, "{}", feature.render(&settings))?;
                }
            }
        }
        writeln!(out, "M30")?;
        Ok(out)
    }

    pub fn dump(&self, path: impl AsRef<Path>) -> ComposeResult<()> {
        let path = path.as_ref();
        let text = self.render()?;
        std::fs::write(path, text)?;
        info!(
            path = %path.display(),
            tools = self.tools.len(),
            features = self.features.len(),
            "Wrote drill composition"
        );
        Ok(())
    }

    fn convert(&mut self, target: Units) {
        let Some(settings) = self.settings.as_mut() else {
            return;
        };
        if settings.units == target {
            return;
        }
        let factor = settings.units.factor_to(target);
        settings.units = target;
        self.error_range *= factor;
        for tool in &mut self.tools {
            tool.diameter *= factor;
        }
        for feature in self
            .features
            .iter_mut()
            .chain(self.blocks.iter_mut().flat_map(|(_, block)| block.iter_mut()))
        {
            feature.scale(factor);
        }
        for statement in self.preamble.iter_mut().chain(self.postamble.iter_mut()) {
            if let ExcellonStatement::Header(text) = statement {
                match (text.as_str(), target) {
                    ("M71", Units::Inch) => *text = "M72".to_string(),
                    ("M72", Units::Metric) => *text = "M71".to_string(),
                    _ => {}
                }
            }
        }
        debug!(units = ?target, error_range = self.error_range, "Converted drill composition");
    }
}

/// Converting an empty composition is a no-op; the first merged source
/// fixes its units.
impl UnitConversion for DrillComposition {
    fn units(&self) -> Units {
        self.settings.map_or(Units::Metric, |settings| settings.units)
    }

    fn to_inch(&mut self) {
        self.convert(Units::Inch);
    }

    fn to_metric(&mut self) {
        self.convert(Units::Metric);
    }
}
