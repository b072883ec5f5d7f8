//! DXF-derived layers.
//!
//! CAD entities are stitched into paths at load time. The paths are then
//! rendered as Gerber draws, fill regions or mouse-bite flashes, or as
//! Excellon routs or mouse-bite hits, depending on the draw mode.

use crate::aperture::ApertureDefinition;
use crate::error::{ComposeError, ComposeResult};
use crate::excellon::{DrillFeature, DrillTool, ExcellonStatement, RoutNode};
use crate::gerber::{CoordStatement, GerberStatement, ParamStatement, Polarity};
use panelkit_core::{
    FileSettings, Notation, Point, Transform, UnitConversion, Units, DEFAULT_ERROR_RANGE,
};
use panelkit_geometry::{
    generate_dots_for, stitch, CadEntity, GraphicPrimitive, Path as GeoPath, PolylineVertex,
    StitchResult,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;
use tracing::{info, warn};

/// How stitched paths are turned into output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Stroke every path with a round aperture of `width`.
    #[default]
    Line,
    /// Fill closed paths as regions.
    Fill,
    /// Perforate paths with dots every `pitch`.
    MouseBites,
}

/// Output dialect of a standalone write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Gerber,
    Excellon,
}

/// A layer built from DXF entities.
#[derive(Debug, Clone, PartialEq)]
pub struct DxfSource {
    pub settings: FileSettings,
    paths: StitchResult,
    draw_mode: DrawMode,
    width: f64,
    pitch: f64,
    error_range: f64,
}

impl DxfSource {
    /// Stitch `entities` with the default error range.
    pub fn from_entities(entities: &[CadEntity], units: Units) -> Self {
        Self::from_entities_with(entities, units, DEFAULT_ERROR_RANGE)
    }

    pub fn from_entities_with(entities: &[CadEntity], units: Units, error_range: f64) -> Self {
        let paths = stitch(entities, error_range);
        let pitch = match units {
            Units::Metric => 1.0,
            Units::Inch => panelkit_core::inch(1.0),
        };
        Self {
            settings: FileSettings::for_units(units),
            paths,
            draw_mode: DrawMode::Line,
            width: 0.0,
            pitch,
            error_range,
        }
    }

    /// Adapt a loaded drawing. Inch drawings keep inch units, anything
    /// else is treated as millimeters.
    pub fn from_drawing(drawing: &::dxf::Drawing) -> Self {
        let units = match drawing.header.default_drawing_units {
            ::dxf::enums::Units::Inches => Units::Inch,
            _ => Units::Metric,
        };
        let entities: Vec<CadEntity> = drawing.entities().filter_map(convert_entity).collect();
        Self::from_entities(&entities, units)
    }

    pub fn load(path: impl AsRef<Path>) -> ComposeResult<Self> {
        let path = path.as_ref();
        let drawing =
            ::dxf::Drawing::load_file(path).map_err(|e| ComposeError::Dxf(e.to_string()))?;
        let source = Self::from_drawing(&drawing);
        info!(
            path = %path.display(),
            closed = source.paths.closed.len(),
            open = source.paths.open.len(),
            "Loaded DXF"
        );
        Ok(source)
    }

    /// Four-line outline with its lower-left corner at `(left, bottom)`.
    pub fn rectangle(
        width: f64,
        height: f64,
        left: f64,
        bottom: f64,
        units: Units,
        draw_mode: DrawMode,
    ) -> Self {
        let corners = [
            Point::new(left, bottom),
            Point::new(left + width, bottom),
            Point::new(left + width, bottom + height),
            Point::new(left, bottom + height),
        ];
        let entities: Vec<CadEntity> = (0..4)
            .map(|i| CadEntity::Line {
                start: corners[i],
                end: corners[(i + 1) % 4],
            })
            .collect();
        let mut source = Self::from_entities(&entities, units);
        source.draw_mode = draw_mode;
        source
    }

    pub fn paths(&self) -> &StitchResult {
        &self.paths
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn set_draw_mode(&mut self, draw_mode: DrawMode) {
        self.draw_mode = draw_mode;
    }

    /// Aperture diameter in Gerber output and tool diameter in drill output.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch;
    }

    pub fn error_range(&self) -> f64 {
        self.error_range
    }

    pub fn set_notation(&mut self, notation: Notation) {
        self.settings.notation = notation;
    }

    pub(crate) fn require_absolute(&self) -> ComposeResult<()> {
        if self.settings.is_absolute() {
            Ok(())
        } else {
            Err(ComposeError::NonAbsoluteNotation(format!(
                "DXF layer uses {} notation",
                self.settings.notation
            )))
        }
    }

    /// Mouse-bite dot positions over every path.
    pub fn dots(&self) -> Vec<Point> {
        generate_dots_for(self.paths.paths(), self.pitch, self.width)
    }

    pub fn aperture(&self, code: u32) -> ApertureDefinition {
        ApertureDefinition::circle(code, self.width)
    }

    pub fn tool(&self, number: u32) -> DrillTool {
        DrillTool::new(number, self.width)
    }

    /// Header block written ahead of apertures in Gerber output.
    pub fn gerber_header(&self) -> Vec<GerberStatement> {
        vec![
            GerberStatement::Code("G75".to_string()),
            GerberStatement::Param(ParamStatement::Units),
            GerberStatement::Param(ParamStatement::Other("OFA0B0".to_string())),
            GerberStatement::Param(ParamStatement::FormatSpec),
            GerberStatement::Param(ParamStatement::Other("IPPOS".to_string())),
            GerberStatement::Param(ParamStatement::LevelPolarity(Polarity::Dark)),
        ]
    }

    /// Drill header split around the tool table.
    pub fn excellon_header(&self) -> (Vec<ExcellonStatement>, Vec<ExcellonStatement>) {
        let mode = if self.settings.units == Units::Inch {
            "M72"
        } else {
            "M71"
        };
        let preamble = vec![
            ExcellonStatement::Header("M48".to_string()),
            ExcellonStatement::Header("FMAT,2".to_string()),
            ExcellonStatement::Header("ICI,OFF".to_string()),
            ExcellonStatement::UnitFormat,
            ExcellonStatement::Header(mode.to_string()),
        ];
        let postamble = vec![ExcellonStatement::Header("%".to_string())];
        (preamble, postamble)
    }

    /// Draw statements selecting aperture `dcode`.
    pub fn to_gerber_statements(&self, dcode: u32) -> Vec<GerberStatement> {
        let mut out = vec![GerberStatement::SelectAperture(dcode)];
        match self.draw_mode {
            DrawMode::Line => {
                push_quadrant_mode(&mut out, self.paths.paths());
                for path in self.paths.paths() {
                    push_path_draws(&mut out, path);
                }
            }
            DrawMode::Fill => {
                if self.paths.closed.is_empty() {
                    warn!("DXF fill layer has no closed paths");
                }
                push_quadrant_mode(&mut out, self.paths.closed.iter());
                out.push(GerberStatement::Code("G36".to_string()));
                for path in &self.paths.closed {
                    push_path_draws(&mut out, path);
                }
                out.push(GerberStatement::Code("G37".to_string()));
            }
            DrawMode::MouseBites => {
                out.extend(
                    self.dots()
                        .into_iter()
                        .map(|p| GerberStatement::Coordinate(CoordStatement::flash(p))),
                );
            }
        }
        out
    }

    /// Drill features bound to tool `tool`.
    pub fn to_drill_features(&self, tool: u32) -> Vec<DrillFeature> {
        match self.draw_mode {
            DrawMode::MouseBites => self
                .dots()
                .into_iter()
                .map(|position| DrillFeature::Hit { tool, position })
                .collect(),
            DrawMode::Line => self
                .paths
                .paths()
                .map(|path| DrillFeature::Rout {
                    tool,
                    nodes: rout_nodes(path),
                })
                .collect(),
            DrawMode::Fill => {
                warn!("Fill mode has no drill rendering, DXF layer skipped");
                Vec::new()
            }
        }
    }

    /// Render as a standalone file of `file_type`.
    pub fn render(&self, file_type: FileType) -> ComposeResult<String> {
        self.require_absolute()?;
        let mut out = String::new();
        match file_type {
            FileType::Gerber => {
                let dcode = 10;
                for statement in self.gerber_header() {
                    writeln!(out, "{}", statement.render(&self.settings))?;
                }
                writeln!(out, "{}", self.aperture(dcode))?;
                for statement in self.to_gerber_statements(dcode) {
                    writeln!(out, "{}", statement.render(&self.settings))?;
                }
                writeln!(out, "{}", GerberStatement::Eof.render(&self.settings))?;
            }
            FileType::Excellon => {
                let (preamble, postamble) = self.excellon_header();
                let tool = self.tool(1);
                for statement in &preamble {
                    writeln!(out, "{}", statement.render(&self.settings))?;
                }
                writeln!(out, "{}", tool.render(&self.settings))?;
                for statement in &postamble {
                    writeln!(out, "{}", statement.render(&self.settings))?;
                }
                writeln!(out, "T{:02}", tool.number)?;
                for feature in self.to_drill_features(tool.number) {
                    writeln!(out, "{}", feature.render(&self.settings))?;
                }
                writeln!(out, "M30")?;
            }
        }
        Ok(out)
    }

    pub fn write(&self, path: impl AsRef<Path>, file_type: FileType) -> ComposeResult<()> {
        let path = path.as_ref();
        let text = self.render(file_type)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), ?file_type, "Wrote DXF layer");
        Ok(())
    }

    fn for_each_path(&mut self, mut f: impl FnMut(&mut GeoPath)) {
        for path in self.paths.closed.iter_mut().chain(self.paths.open.iter_mut()) {
            f(path);
        }
    }

    fn convert(&mut self, target: Units) {
        if self.settings.units == target {
            return;
        }
        let factor = self.settings.units.factor_to(target);
        self.for_each_path(|path| path.scale(factor));
        self.width *= factor;
        self.pitch *= factor;
        self.error_range *= factor;
        self.settings = FileSettings {
            units: target,
            format: panelkit_core::CoordinateFormat::for_units(target),
            ..self.settings
        };
    }
}

impl Transform for DxfSource {
    fn offset(&mut self, dx: f64, dy: f64) {
        self.for_each_path(|path| path.offset(dx, dy));
    }

    fn rotate(&mut self, angle: f64, center: Point) {
        self.for_each_path(|path| path.rotate(angle, center));
    }

    fn scale(&mut self, factor: f64) {
        self.for_each_path(|path| path.scale(factor));
        self.width *= factor;
        self.pitch *= factor;
        self.error_range *= factor;
    }
}

impl UnitConversion for DxfSource {
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

/// Select multi-quadrant mode when any path draws an arc. Offsets are
/// written signed.
fn push_quadrant_mode<'a>(
    out: &mut Vec<GerberStatement>,
    mut paths: impl Iterator<Item = &'a GeoPath>,
) {
    let has_arcs = paths.any(|path| {
        path.primitives()
            .iter()
            .any(|p| !matches!(p, GraphicPrimitive::Line(_)))
    });
    if has_arcs {
        out.push(GerberStatement::Code("G75".to_string()));
    }
}

fn push_path_draws(out: &mut Vec<GerberStatement>, path: &GeoPath) {
    out.push(GerberStatement::Coordinate(CoordStatement::move_to(
        path.start(),
    )));
    for primitive in path.primitives() {
        let statement = match primitive {
            GraphicPrimitive::Line(line) => CoordStatement::line_to(line.end),
            GraphicPrimitive::Arc(arc) => CoordStatement::arc_to(
                arc.end,
                Point::new(arc.center.x - arc.start.x, arc.center.y - arc.start.y),
                arc.ccw,
            ),
            GraphicPrimitive::Circle(circle) => CoordStatement::arc_to(
                circle.start(),
                Point::new(-circle.radius, 0.0),
                true,
            ),
        };
        out.push(GerberStatement::Coordinate(statement));
    }
}

/// Rout nodes for a path. An `A` radius only describes the shorter arc
/// between two points, so arcs sweeping more than half a turn and circles
/// are split at their midpoint.
fn rout_nodes(path: &GeoPath) -> Vec<RoutNode> {
    let mut nodes = vec![RoutNode::rapid(path.start())];
    for primitive in path.primitives() {
        match primitive {
            GraphicPrimitive::Line(line) => nodes.push(RoutNode::linear(line.end)),
            GraphicPrimitive::Arc(arc) => {
                if arc.sweep() > 180.0 {
                    let midpoint = arc.point_at(arc.length() / 2.0);
                    nodes.push(RoutNode::arc(midpoint, arc.radius, arc.ccw));
                }
                nodes.push(RoutNode::arc(arc.end, arc.radius, arc.ccw));
            }
            GraphicPrimitive::Circle(circle) => {
                let start = circle.start();
                let opposite = Point::new(circle.center.x - circle.radius, circle.center.y);
                nodes.push(RoutNode::arc(opposite, circle.radius, true));
                nodes.push(RoutNode::arc(start, circle.radius, true));
            }
        }
    }
    nodes
}

fn convert_entity(entity: &::dxf::entities::Entity) -> Option<CadEntity> {
    match &entity.specific {
        ::dxf::entities::EntityType::Line(line) => Some(CadEntity::Line {
            start: Point::new(line.p1.x, line.p1.y),
            end: Point::new(line.p2.x, line.p2.y),
        }),
        ::dxf::entities::EntityType::Circle(circle) => Some(CadEntity::Circle {
            center: Point::new(circle.center.x, circle.center.y),
            radius: circle.radius,
        }),
        ::dxf::entities::EntityType::Arc(arc) => Some(CadEntity::Arc {
            center: Point::new(arc.center.x, arc.center.y),
            radius: arc.radius,
            start_angle: arc.start_angle,
            end_angle: arc.end_angle,
        }),
        ::dxf::entities::EntityType::LwPolyline(lwpoly) => Some(CadEntity::Polyline {
            vertices: lwpoly
                .vertices
                .iter()
                .map(|v| PolylineVertex::new(v.x, v.y, v.bulge))
                .collect(),
            closed: lwpoly.is_closed(),
        }),
        _ => None,
    }
}
