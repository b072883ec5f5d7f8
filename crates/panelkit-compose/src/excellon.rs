//! Excellon drill source model.
//!
//! Header statements are kept in order; drill features (hits, slots and
//! routed paths) are kept separately with their tool numbers.

use crate::error::{ComposeError, ComposeResult};
use panelkit_core::{
    format_decimal, format_with, is_equal_value, rotate_point, FileSettings, Point, UnitConversion,
    Units, ZeroSuppression,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

/// A tool table entry, `T<nn>C<diameter>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillTool {
    pub number: u32,
    pub diameter: f64,
}

impl DrillTool {
    pub fn new(number: u32, diameter: f64) -> Self {
        Self { number, diameter }
    }

    /// Same diameter within `error_range`.
    pub fn is_equivalent(&self, other: &DrillTool, error_range: f64) -> bool {
        is_equal_value(self.diameter, other.diameter, error_range)
    }

    pub fn render(&self, settings: &FileSettings) -> String {
        format!(
            "T{:02}C{}",
            self.number,
            format_decimal(self.diameter, settings.format.decimal())
        )
    }
}

/// Header-area statements of an Excellon file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExcellonStatement {
    /// A verbatim header line such as `M48`, `FMAT,2`, `%` or `G90`.
    Header(String),
    /// `METRIC,TZ,000.0000`, rendered from the file settings.
    UnitFormat,
    ToolDefinition(DrillTool),
    ToolSelect(u32),
    Other(String),
}

impl ExcellonStatement {
    pub fn render(&self, settings: &FileSettings) -> String {
        match self {
            Self::Header(text) | Self::Other(text) => text.clone(),
            Self::UnitFormat => unit_format(settings),
            Self::ToolDefinition(tool) => tool.render(settings),
            Self::ToolSelect(number) => format!("T{:02}", number),
        }
    }
}

/// `TZ` keeps trailing zeros (leading suppressed), `LZ` the opposite.
fn unit_format(settings: &FileSettings) -> String {
    let units = match settings.units {
        Units::Metric => "METRIC",
        Units::Inch => "INCH",
    };
    let zeros = match settings.zero_suppression {
        ZeroSuppression::Leading => "TZ",
        ZeroSuppression::Trailing => "LZ",
    };
    if settings.units == Units::Inch
        && settings.format.integer() == 2
        && settings.format.decimal() == 4
    {
        return format!("{},{}", units, zeros);
    }
    format!(
        "{},{},{}.{}",
        units,
        zeros,
        "0".repeat(usize::from(settings.format.integer())),
        "0".repeat(usize::from(settings.format.decimal()))
    )
}

/// Motion mode of a rout node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutMode {
    /// `G00`, only valid as the first node.
    Rapid,
    /// `G01`
    Linear,
    /// `G02`
    ClockwiseArc,
    /// `G03`
    CounterClockwiseArc,
}

impl RoutMode {
    pub fn code(self) -> &'static str {
        match self {
            Self::Rapid => "G00",
            Self::Linear => "G01",
            Self::ClockwiseArc => "G02",
            Self::CounterClockwiseArc => "G03",
        }
    }
}

/// One vertex of a routed path.
///
/// Arc nodes carry either a `radius` (`A` word) or a `center_offset`
/// relative to the previous node (`I`/`J` words).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutNode {
    pub mode: RoutMode,
    pub position: Point,
    pub radius: Option<f64>,
    pub center_offset: Option<Point>,
}

impl RoutNode {
    pub fn rapid(position: Point) -> Self {
        Self {
            mode: RoutMode::Rapid,
            position,
            radius: None,
            center_offset: None,
        }
    }

    pub fn linear(position: Point) -> Self {
        Self {
            mode: RoutMode::Linear,
            ..Self::rapid(position)
        }
    }

    pub fn arc(position: Point, radius: f64, ccw: bool) -> Self {
        Self {
            mode: if ccw {
                RoutMode::CounterClockwiseArc
            } else {
                RoutMode::ClockwiseArc
            },
            position,
            radius: Some(radius),
            center_offset: None,
        }
    }

    fn render(&self, settings: &FileSettings) -> String {
        let mut out = String::from(self.mode.code());
        out.push_str(&render_xy(self.position, settings));
        if let Some(radius) = self.radius {
            out.push('A');
            out.push_str(&format_with(radius, settings));
        }
        if let Some(offset) = self.center_offset {
            out.push('I');
            out.push_str(&format_with(offset.x, settings));
            out.push('J');
            out.push_str(&format_with(offset.y, settings));
        }
        out
    }
}

/// A machining feature bound to a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrillFeature {
    Hit {
        tool: u32,
        position: Point,
    },
    /// `G85` slot between two points.
    Slot {
        tool: u32,
        start: Point,
        end: Point,
    },
    /// Routed path; the first node is the rapid move to the plunge point.
    Rout {
        tool: u32,
        nodes: Vec<RoutNode>,
    },
}

impl DrillFeature {
    pub fn tool(&self) -> u32 {
        match self {
            Self::Hit { tool, .. } | Self::Slot { tool, .. } | Self::Rout { tool, .. } => *tool,
        }
    }

    pub fn set_tool(&mut self, number: u32) {
        match self {
            Self::Hit { tool, .. } | Self::Slot { tool, .. } | Self::Rout { tool, .. } => {
                *tool = number
            }
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Render as one or more newline-separated lines.
    pub fn render(&self, settings: &FileSettings) -> String {
        match self {
            Self::Hit { position, .. } => render_xy(*position, settings),
            Self::Slot { start, end, .. } => format!(
                "{}G85{}",
                render_xy(*start, settings),
                render_xy(*end, settings)
            ),
            Self::Rout { nodes, .. } => {
                let mut lines = Vec::with_capacity(nodes.len() + 3);
                let mut iter = nodes.iter();
                if let Some(first) = iter.next() {
                    let plunge = RoutNode {
                        mode: RoutMode::Rapid,
                        ..*first
                    };
                    lines.push(plunge.render(settings));
                    lines.push("M15".to_string());
                }
                lines.extend(iter.map(|node| node.render(settings)));
                lines.push("M16".to_string());
                lines.push("G05".to_string());
                lines.join("\n")
            }
        }
    }

    fn offset(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Hit { position, .. } => *position = position.offset(dx, dy),
            Self::Slot { start, end, .. } => {
                *start = start.offset(dx, dy);
                *end = end.offset(dx, dy);
            }
            Self::Rout { nodes, .. } => {
                for node in nodes {
                    node.position = node.position.offset(dx, dy);
                }
            }
        }
    }

    fn rotate(&mut self, angle: f64, center: Point) {
        match self {
            Self::Hit { position, .. } => *position = rotate_point(*position, center, angle),
            Self::Slot { start, end, .. } => {
                *start = rotate_point(*start, center, angle);
                *end = rotate_point(*end, center, angle);
            }
            Self::Rout { nodes, .. } => {
                for node in nodes {
                    node.position = rotate_point(node.position, center, angle);
                    // relative vector, turns about the origin
                    if let Some(offset) = node.center_offset {
                        node.center_offset = Some(rotate_point(offset, Point::origin(), angle));
                    }
                }
            }
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        match self {
            Self::Hit { position, .. } => *position = position.scaled(factor),
            Self::Slot { start, end, .. } => {
                *start = start.scaled(factor);
                *end = end.scaled(factor);
            }
            Self::Rout { nodes, .. } => {
                for node in nodes {
                    node.position = node.position.scaled(factor);
                    node.radius = node.radius.map(|r| r * factor);
                    node.center_offset = node.center_offset.map(|o| o.scaled(factor));
                }
            }
        }
    }
}

fn render_xy(p: Point, settings: &FileSettings) -> String {
    format!("X{}Y{}", format_with(p.x, settings), format_with(p.y, settings))
}

/// A parsed Excellon drill file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcellonSource {
    pub settings: FileSettings,
    pub statements: Vec<ExcellonStatement>,
    pub tools: BTreeMap<u32, DrillTool>,
    pub features: Vec<DrillFeature>,
}

impl ExcellonSource {
    pub fn new(
        settings: FileSettings,
        statements: Vec<ExcellonStatement>,
        tools: BTreeMap<u32, DrillTool>,
        features: Vec<DrillFeature>,
    ) -> Self {
        Self {
            settings,
            statements,
            tools,
            features,
        }
    }

    /// Source whose statement list is the standard header and tool table.
    pub fn with_tools(settings: FileSettings, tools: Vec<DrillTool>, features: Vec<DrillFeature>) -> Self {
        let mut statements = vec![
            ExcellonStatement::Header("M48".to_string()),
            ExcellonStatement::UnitFormat,
        ];
        statements.extend(tools.iter().copied().map(ExcellonStatement::ToolDefinition));
        statements.push(ExcellonStatement::Header("%".to_string()));
        if let Some(first) = tools.first() {
            statements.push(ExcellonStatement::ToolSelect(first.number));
        }
        let tools = tools.into_iter().map(|t| (t.number, t)).collect();
        Self::new(settings, statements, tools, features)
    }

    pub fn hit_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_hit()).count()
    }

    /// Fail on the first feature whose tool is missing from the table.
    pub fn check_tools(&self) -> ComposeResult<()> {
        match self
            .features
            .iter()
            .find(|f| !self.tools.contains_key(&f.tool()))
        {
            Some(feature) => Err(ComposeError::UnknownTool(feature.tool())),
            None => Ok(()),
        }
    }

    pub fn offset(&mut self, dx: f64, dy: f64) {
        for feature in &mut self.features {
            feature.offset(dx, dy);
        }
    }

    /// Rotate every feature; a multiple of a full turn is a no-op.
    pub fn rotate(&mut self, angle: f64, center: Point) {
        if angle % 360.0 == 0.0 {
            return;
        }
        for feature in &mut self.features {
            feature.rotate(angle, center);
        }
    }

    /// Standalone output with absolute notation and the full tool table.
    pub fn render(&self) -> ComposeResult<String> {
        let mut settings = self.settings;
        settings.notation = panelkit_core::Notation::Absolute;

        let mut out = String::new();
        writeln!(out, "M48")?;
        writeln!(out, "FMAT,2")?;
        writeln!(out, "ICI,OFF")?;
        writeln!(out, "{}", unit_format(&settings))?;
        for tool in self.tools.values() {
            writeln!(out, "{}", tool.render(&settings))?;
        }
        writeln!(out, "%")?;
        writeln!(out, "G90")?;
        writeln!(
            out,
            "{}",
            if settings.units == Units::Inch { "M72" } else { "M71" }
        )?;
        for tool in self.tools.values() {
            writeln!(out, "T{:02}", tool.number)?;
            for feature in self.features.iter().filter(|f| f.tool() == tool.number) {
                writeln!(out, "{}", feature.render(&settings))?;
            }
        }
        writeln!(out, "M30")?;
        Ok(out)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> ComposeResult<()> {
        let path = path.as_ref();
        let text = self.render()?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), tools = self.tools.len(), "Wrote drill file");
        Ok(())
    }

    fn convert(&mut self, target: Units) {
        if self.settings.units == target {
            return;
        }
        let factor = self.settings.units.factor_to(target);
        for tool in self.tools.values_mut() {
            tool.diameter *= factor;
        }
        for statement in &mut self.statements {
            if let ExcellonStatement::ToolDefinition(tool) = statement {
                tool.diameter *= factor;
            }
        }
        for feature in &mut self.features {
            feature.scale(factor);
        }
        self.settings.units = target;
    }
}

impl UnitConversion for ExcellonSource {
    fn units(&self) -> Units {
        self.settings.units
    }

    fn to_inch(&mut self) {
        self.convert(Units::Inch);
    }

    fn to_metric(&mut self) {
        self.convert(Units::Metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkit_core::is_equal_point;

    fn metric() -> FileSettings {
        FileSettings::for_units(Units::Metric)
    }

    #[test]
    fn test_tool_render() {
        assert_eq!(DrillTool::new(1, 0.8).render(&metric()), "T01C0.8000");
        let inch = FileSettings::for_units(Units::Inch);
        assert_eq!(DrillTool::new(12, 0.035).render(&inch), "T12C0.03500");
    }

    #[test]
    fn test_unit_format() {
        assert_eq!(unit_format(&metric()), "METRIC,TZ,000.0000");
        let mut inch = FileSettings::for_units(Units::Inch);
        inch.format = panelkit_core::CoordinateFormat::new(2, 4).unwrap();
        inch.zero_suppression = ZeroSuppression::Trailing;
        assert_eq!(unit_format(&inch), "INCH,LZ");
    }

    #[test]
    fn test_rout_render() {
        let rout = DrillFeature::Rout {
            tool: 1,
            nodes: vec![
                RoutNode::linear(Point::new(0.0, 0.0)),
                RoutNode::linear(Point::new(1.0, 0.0)),
                RoutNode::arc(Point::new(2.0, 1.0), 1.0, true),
            ],
        };
        assert_eq!(
            rout.render(&metric()),
            "G00X0Y0\nM15\nG01X10000Y0\nG03X20000Y10000A10000\nM16\nG05"
        );
    }

    #[test]
    fn test_slot_render() {
        let slot = DrillFeature::Slot {
            tool: 2,
            start: Point::new(1.0, 1.0),
            end: Point::new(3.0, 1.0),
        };
        assert_eq!(slot.render(&metric()), "X10000Y10000G85X30000Y10000");
    }

    #[test]
    fn test_rotate_rout_offsets_about_origin() {
        let mut file = ExcellonSource::with_tools(
            metric(),
            vec![DrillTool::new(1, 1.0)],
            vec![DrillFeature::Rout {
                tool: 1,
                nodes: vec![
                    RoutNode::rapid(Point::new(5.0, 5.0)),
                    RoutNode {
                        mode: RoutMode::ClockwiseArc,
                        position: Point::new(6.0, 6.0),
                        radius: None,
                        center_offset: Some(Point::new(1.0, 0.0)),
                    },
                ],
            }],
        );
        file.rotate(90.0, Point::new(5.0, 5.0));
        let DrillFeature::Rout { nodes, .. } = &file.features[0] else {
            panic!("expected rout");
        };
        assert!(is_equal_point(nodes[0].position, Point::new(5.0, 5.0), 1e-9));
        assert!(is_equal_point(nodes[1].position, Point::new(4.0, 6.0), 1e-9));
        assert!(is_equal_point(nodes[1].center_offset.unwrap(), Point::new(0.0, 1.0), 1e-9));
    }

    #[test]
    fn test_unit_conversion_is_idempotent() {
        let mut file = ExcellonSource::with_tools(
            FileSettings::for_units(Units::Inch),
            vec![DrillTool::new(1, 0.1)],
            vec![DrillFeature::Hit {
                tool: 1,
                position: Point::new(1.0, 2.0),
            }],
        );
        file.to_metric();
        let once = file.clone();
        file.to_metric();
        assert_eq!(file, once);
        assert!(is_equal_value(file.tools[&1].diameter, 2.54, 1e-9));
        file.to_inch();
        let DrillFeature::Hit { position, .. } = file.features[0] else {
            panic!("expected hit");
        };
        assert!(is_equal_point(position, Point::new(1.0, 2.0), 1e-9));
    }

    #[test]
    fn test_check_tools() {
        let file = ExcellonSource::with_tools(
            metric(),
            vec![DrillTool::new(1, 1.0)],
            vec![DrillFeature::Hit {
                tool: 4,
                position: Point::origin(),
            }],
        );
        assert!(matches!(file.check_tools(), Err(ComposeError::UnknownTool(4))));
    }

    #[test]
    fn test_render_standalone() {
        let file = ExcellonSource::with_tools(
            metric(),
            vec![DrillTool::new(1, 0.8), DrillTool::new(2, 1.0)],
            vec![
                DrillFeature::Hit {
                    tool: 2,
                    position: Point::new(1.0, 1.0),
                },
                DrillFeature::Hit {
                    tool: 1,
                    position: Point::new(2.0, 2.0),
                },
            ],
        );
        let text = file.render().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "M48",
                "FMAT,2",
                "ICI,OFF",
                "METRIC,TZ,000.0000",
                "T01C0.8000",
                "T02C1.0000",
                "%",
                "G90",
                "M71",
                "T01",
                "X20000Y20000",
                "T02",
                "X10000Y10000",
                "M30",
            ]
        );
    }
}
