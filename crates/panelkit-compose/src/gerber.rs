//! Gerber (RS-274X) source model.
//!
//! Statements arrive already parsed. The model keeps them in order and
//! applies offset, rotation and unit conversion in place.

use crate::aperture::{ApertureDefinition, ApertureMacro, ApertureShape};
use crate::error::ComposeResult;
use panelkit_core::{
    format_with, rotate_point, FileSettings, Notation, Point, UnitConversion, Units,
    ZeroSuppression,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::debug;

/// Image polarity selected by `%LP..*%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Dark,
    Clear,
}

/// Interpolation mode prefix of a coordinate statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// `G01`
    Linear,
    /// `G02`
    ClockwiseArc,
    /// `G03`
    CounterClockwiseArc,
}

impl Interpolation {
    pub fn code(self) -> &'static str {
        match self {
            Self::Linear => "G01",
            Self::ClockwiseArc => "G02",
            Self::CounterClockwiseArc => "G03",
        }
    }
}

/// Operation suffix of a coordinate statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DOperation {
    /// `D01`
    Interpolate,
    /// `D02`
    Move,
    /// `D03`
    Flash,
}

impl DOperation {
    pub fn code(self) -> &'static str {
        match self {
            Self::Interpolate => "D01",
            Self::Move => "D02",
            Self::Flash => "D03",
        }
    }
}

/// `[G0x]X..Y..I..J..D0x*`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordStatement {
    pub function: Option<Interpolation>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub operation: Option<DOperation>,
}

impl CoordStatement {
    pub fn move_to(p: Point) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            operation: Some(DOperation::Move),
            ..Default::default()
        }
    }

    pub fn line_to(p: Point) -> Self {
        Self {
            function: Some(Interpolation::Linear),
            x: Some(p.x),
            y: Some(p.y),
            operation: Some(DOperation::Interpolate),
            ..Default::default()
        }
    }

    /// Arc draw to `p`; `offset` is the center relative to the current point.
    pub fn arc_to(p: Point, offset: Point, ccw: bool) -> Self {
        Self {
            function: Some(if ccw {
                Interpolation::CounterClockwiseArc
            } else {
                Interpolation::ClockwiseArc
            }),
            x: Some(p.x),
            y: Some(p.y),
            i: Some(offset.x),
            j: Some(offset.y),
            operation: Some(DOperation::Interpolate),
        }
    }

    pub fn flash(p: Point) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            operation: Some(DOperation::Flash),
            ..Default::default()
        }
    }

    /// Carries a center offset, or draws an arc where omitted offsets mean 0.
    fn has_arc_offset(&self) -> bool {
        self.i.is_some()
            || self.j.is_some()
            || matches!(
                self.function,
                Some(Interpolation::ClockwiseArc | Interpolation::CounterClockwiseArc)
            )
    }

    fn scale(&mut self, factor: f64) {
        for value in [&mut self.x, &mut self.y, &mut self.i, &mut self.j]
            .into_iter()
            .flatten()
        {
            *value *= factor;
        }
    }

    fn render(&self, settings: &FileSettings) -> String {
        let mut out = String::new();
        if let Some(function) = self.function {
            out.push_str(function.code());
        }
        for (axis, value) in [("X", self.x), ("Y", self.y), ("I", self.i), ("J", self.j)] {
            if let Some(value) = value {
                out.push_str(axis);
                out.push_str(&format_with(value, settings));
            }
        }
        if let Some(operation) = self.operation {
            out.push_str(operation.code());
        }
        out.push('*');
        out
    }
}

/// Extended (`%..%`) parameter statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamStatement {
    /// `%FS..*%`, rendered from the file settings.
    FormatSpec,
    /// `%MO..*%`, rendered from the file settings.
    Units,
    ApertureMacro(ApertureMacro),
    ApertureDefinition(ApertureDefinition),
    LevelPolarity(Polarity),
    /// Any other parameter kept verbatim without the `%` and `*` framing.
    Other(String),
}

/// A parsed Gerber statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GerberStatement {
    /// `G04 <text>*`
    Comment(String),
    Param(ParamStatement),
    Coordinate(CoordStatement),
    /// `D<code>*` with code >= 10
    SelectAperture(u32),
    /// A bare function code such as `G36`, `G37`, `G75` or `G01`.
    Code(String),
    /// `M02*`
    Eof,
    /// A statement obsolete in current Gerber, kept verbatim.
    Deprecated(String),
}

impl GerberStatement {
    /// Render the statement using `settings` for coordinates and headers.
    pub fn render(&self, settings: &FileSettings) -> String {
        match self {
            Self::Comment(text) => format!("G04 {}*", text),
            Self::Param(param) => render_param(param, settings),
            Self::Coordinate(coord) => coord.render(settings),
            Self::SelectAperture(code) => format!("D{}*", code),
            Self::Code(code) => format!("{}*", code),
            Self::Eof => "M02*".to_string(),
            Self::Deprecated(text) => format!("{}*", text),
        }
    }
}

fn render_param(param: &ParamStatement, settings: &FileSettings) -> String {
    match param {
        ParamStatement::FormatSpec => {
            let zeros = match settings.zero_suppression {
                ZeroSuppression::Leading => "L",
                ZeroSuppression::Trailing => "T",
            };
            let notation = match settings.notation {
                Notation::Absolute => "A",
                Notation::Incremental => "I",
            };
            let digits = format!("{}{}", settings.format.integer(), settings.format.decimal());
            format!("%FS{}{}X{}Y{}*%", zeros, notation, digits, digits)
        }
        ParamStatement::Units => match settings.units {
            Units::Metric => "%MOMM*%".to_string(),
            Units::Inch => "%MOIN*%".to_string(),
        },
        ParamStatement::ApertureMacro(am) => am.to_string(),
        ParamStatement::ApertureDefinition(ad) => ad.to_string(),
        ParamStatement::LevelPolarity(Polarity::Dark) => "%LPD*%".to_string(),
        ParamStatement::LevelPolarity(Polarity::Clear) => "%LPC*%".to_string(),
        ParamStatement::Other(text) => format!("%{}*%", text),
    }
}

/// A parsed Gerber layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GerberSource {
    pub settings: FileSettings,
    pub statements: Vec<GerberStatement>,
}

impl GerberSource {
    pub fn new(settings: FileSettings, statements: Vec<GerberStatement>) -> Self {
        Self {
            settings,
            statements,
        }
    }

    pub fn apertures(&self) -> impl Iterator<Item = &ApertureDefinition> {
        self.statements.iter().filter_map(|s| match s {
            GerberStatement::Param(ParamStatement::ApertureDefinition(ad)) => Some(ad),
            _ => None,
        })
    }

    pub fn macros(&self) -> impl Iterator<Item = &ApertureMacro> {
        self.statements.iter().filter_map(|s| match s {
            GerberStatement::Param(ParamStatement::ApertureMacro(am)) => Some(am),
            _ => None,
        })
    }

    /// Render the layer as standalone Gerber text.
    pub fn render(&self) -> ComposeResult<String> {
        let mut out = String::new();
        for statement in &self.statements {
            writeln!(out, "{}", statement.render(&self.settings))?;
        }
        Ok(out)
    }

    /// Replace rectangle, obround and polygon apertures with equivalent
    /// macro apertures so they can be rotated.
    ///
    /// The generated macros are inserted after the last macro preceding the
    /// first affected aperture, or before the first aperture definition when
    /// no macro precedes it. Names get a `_<n>` suffix on collision.
    pub fn generalize_apertures(&mut self) -> ComposeResult<()> {
        let mut first_variant = None;
        let mut first_aperture = None;
        let mut insert_at = None;
        let mut used = [false; 4];
        let mut names: HashSet<String> = HashSet::new();

        for (idx, statement) in self.statements.iter().enumerate() {
            match statement {
                GerberStatement::Param(ParamStatement::ApertureMacro(am)) => {
                    names.insert(am.name.clone());
                    if first_variant.is_none() {
                        insert_at = Some(idx + 1);
                    }
                }
                GerberStatement::Param(ParamStatement::ApertureDefinition(ad)) => {
                    first_aperture.get_or_insert(idx);
                    if let Some(kind) = generalized_kind(ad) {
                        used[kind] = true;
                        first_variant.get_or_insert(idx);
                    }
                }
                _ => {}
            }
        }

        if first_variant.is_none() {
            return Ok(());
        }
        let insert_at = insert_at.or(first_aperture).unwrap_or(0);

        let mut generated: Vec<Option<String>> = vec![None; 4];
        let mut inserted = Vec::new();
        for (kind, base) in GENERALIZED_NAMES.iter().enumerate() {
            if !used[kind] {
                continue;
            }
            let name = unique_name(base, &names);
            names.insert(name.clone());
            let am = match kind {
                RECTANGLE => ApertureMacro::rectangle(name.clone())?,
                LANDSCAPE_OBROUND => ApertureMacro::landscape_obround(name.clone())?,
                PORTRAIT_OBROUND => ApertureMacro::portrait_obround(name.clone())?,
                _ => ApertureMacro::polygon(name.clone())?,
            };
            inserted.push(GerberStatement::Param(ParamStatement::ApertureMacro(am)));
            generated[kind] = Some(name);
        }
        debug!(macros = inserted.len(), "Generalized rotation-variant apertures");
        for statement in inserted.into_iter().rev() {
            self.statements.insert(insert_at, statement);
        }

        for statement in &mut self.statements {
            if let GerberStatement::Param(ParamStatement::ApertureDefinition(ad)) = statement {
                if let Some(kind) = generalized_kind(ad) {
                    if let Some(name) = &generated[kind] {
                        ad.shape = ApertureShape::Macro(name.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Rotate counter-clockwise by `angle` degrees about `center`.
    ///
    /// Arc center offsets are re-derived from the rotated absolute center
    /// minus the rotated current point; an omitted `I` or `J` counts as 0.
    /// Multiples of a full turn are no-ops.
    pub fn rotate(&mut self, angle: f64, center: Point) -> ComposeResult<()> {
        if angle % 360.0 == 0.0 {
            return Ok(());
        }
        self.generalize_apertures()?;

        let mut last = Point::origin();
        let mut last_rotated = rotate_point(last, center, angle);
        for statement in &mut self.statements {
            match statement {
                GerberStatement::Param(ParamStatement::ApertureMacro(am)) => am.rotate(angle),
                GerberStatement::Coordinate(coord) => {
                    if coord.has_arc_offset() {
                        let (i, j) = (coord.i.unwrap_or(0.0), coord.j.unwrap_or(0.0));
                        let arc_center = rotate_point(last.offset(i, j), center, angle);
                        coord.i = Some(arc_center.x - last_rotated.x);
                        coord.j = Some(arc_center.y - last_rotated.y);
                    }
                    if coord.x.is_some() || coord.y.is_some() {
                        let target = Point::new(coord.x.unwrap_or(last.x), coord.y.unwrap_or(last.y));
                        let rotated = rotate_point(target, center, angle);
                        coord.x = Some(rotated.x);
                        coord.y = Some(rotated.y);
                        last = target;
                        last_rotated = rotated;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn offset(&mut self, dx: f64, dy: f64) {
        for statement in &mut self.statements {
            if let GerberStatement::Coordinate(coord) = statement {
                if let Some(x) = coord.x.as_mut() {
                    *x += dx;
                }
                if let Some(y) = coord.y.as_mut() {
                    *y += dy;
                }
            }
        }
    }

    fn convert(&mut self, target: Units) {
        if self.settings.units == target {
            return;
        }
        let factor = self.settings.units.factor_to(target);
        for statement in &mut self.statements {
            match statement {
                GerberStatement::Coordinate(coord) => coord.scale(factor),
                GerberStatement::Param(ParamStatement::ApertureDefinition(ad)) => ad.scale(factor),
                GerberStatement::Param(ParamStatement::ApertureMacro(am)) => am.convert_units(target),
                _ => {}
            }
        }
        self.settings.units = target;
    }
}

impl UnitConversion for GerberSource {
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

const RECTANGLE: usize = 0;
const LANDSCAPE_OBROUND: usize = 1;
const PORTRAIT_OBROUND: usize = 2;
const POLYGON: usize = 3;
const GENERALIZED_NAMES: [&str; 4] = ["MACR", "MACLO", "MACPO", "MACP"];

fn generalized_kind(ad: &ApertureDefinition) -> Option<usize> {
    match ad.shape {
        ApertureShape::Rectangle => Some(RECTANGLE),
        ApertureShape::Obround => {
            let x = ad.modifiers.first().copied().unwrap_or(0.0);
            let y = ad.modifiers.get(1).copied().unwrap_or(0.0);
            Some(if x > y {
                LANDSCAPE_OBROUND
            } else {
                PORTRAIT_OBROUND
            })
        }
        ApertureShape::Polygon => Some(POLYGON),
        _ => None,
    }
}

/// `base`, or `base_1`, `base_2`, ... until unused.
pub(crate) fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut suffix = 0;
    while taken.contains(&name) {
        suffix += 1;
        name = format!("{}_{}", base, suffix);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkit_core::is_equal_value;

    fn source(statements: Vec<GerberStatement>) -> GerberSource {
        GerberSource::new(FileSettings::for_units(Units::Metric), statements)
    }

    fn ad(ad: ApertureDefinition) -> GerberStatement {
        GerberStatement::Param(ParamStatement::ApertureDefinition(ad))
    }

    #[test]
    fn test_coord_render() {
        let settings = FileSettings::for_units(Units::Metric);
        let stmt = CoordStatement::arc_to(Point::new(1.0, 2.0), Point::new(-0.5, 0.0), true);
        assert_eq!(stmt.render(&settings), "G03X10000Y20000I-5000J0D01*");
        assert_eq!(
            CoordStatement::flash(Point::new(0.25, 0.0)).render(&settings),
            "X2500Y0D03*"
        );
    }

    #[test]
    fn test_header_render() {
        let settings = FileSettings::for_units(Units::Inch);
        assert_eq!(
            GerberStatement::Param(ParamStatement::FormatSpec).render(&settings),
            "%FSLAX25Y25*%"
        );
        assert_eq!(
            GerberStatement::Param(ParamStatement::Units).render(&settings),
            "%MOIN*%"
        );
        assert_eq!(
            GerberStatement::Param(ParamStatement::Other("IPPOS".into())).render(&settings),
            "%IPPOS*%"
        );
    }

    #[test]
    fn test_rotate_rectangle_becomes_macro() {
        let mut file = source(vec![
            GerberStatement::Param(ParamStatement::FormatSpec),
            ad(ApertureDefinition::circle(10, 0.5)),
            ad(ApertureDefinition::rectangle(11, 2.0, 1.0)),
        ]);
        file.rotate(90.0, Point::origin()).unwrap();

        let macros: Vec<&ApertureMacro> = file.macros().collect();
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].name, "MACR");
        // inserted before the first aperture definition
        assert!(matches!(
            file.statements[1],
            GerberStatement::Param(ParamStatement::ApertureMacro(_))
        ));
        let shapes: Vec<&ApertureShape> = file.apertures().map(|a| &a.shape).collect();
        assert_eq!(shapes[0], &ApertureShape::Circle);
        assert_eq!(shapes[1], &ApertureShape::Macro("MACR".into()));
        assert_eq!(macros_rotation(&file), "21,1,$1,$2,0,0,90");
    }

    fn macros_rotation(file: &GerberSource) -> String {
        file.macros()
            .next()
            .map(|m| m.content[0].to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_generalize_avoids_name_collision_and_picks_obround_orientation() {
        let mut file = source(vec![
            GerberStatement::Param(ParamStatement::ApertureMacro(
                ApertureMacro::parse("MACLO", "1,1,$1,0,0").unwrap(),
            )),
            ad(ApertureDefinition::new(10, ApertureShape::Obround, vec![2.0, 1.0])),
            ad(ApertureDefinition::new(11, ApertureShape::Obround, vec![1.0, 2.0])),
        ]);
        file.generalize_apertures().unwrap();
        let names: Vec<&str> = file.macros().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["MACLO", "MACLO_1", "MACPO"]);
        let shapes: Vec<String> = file.apertures().map(|a| a.shape.code().to_string()).collect();
        assert_eq!(shapes, vec!["MACLO_1", "MACPO"]);
    }

    #[test]
    fn test_rotate_recomputes_arc_offsets() {
        let mut file = source(vec![
            GerberStatement::Coordinate(CoordStatement::move_to(Point::new(2.0, 0.0))),
            GerberStatement::Coordinate(CoordStatement::arc_to(
                Point::new(0.0, 2.0),
                Point::new(-2.0, 0.0),
                true,
            )),
        ]);
        file.rotate(90.0, Point::new(1.0, 1.0)).unwrap();

        // start (2,0) -> (2,2); center (0,0) -> (2,0); offset (0,-2)
        let GerberStatement::Coordinate(arc) = file.statements[1] else {
            panic!("expected coordinate");
        };
        assert!(is_equal_value(arc.i.unwrap(), 0.0, 1e-9));
        assert!(is_equal_value(arc.j.unwrap(), -2.0, 1e-9));
        // end (0,2) -> (0,0)
        assert!(is_equal_value(arc.x.unwrap(), 0.0, 1e-9));
        assert!(is_equal_value(arc.y.unwrap(), 0.0, 1e-9));
    }

    #[test]
    fn test_rotate_fills_omitted_arc_offset() {
        let mut arc = CoordStatement::arc_to(Point::new(0.0, 2.0), Point::new(-2.0, 0.0), true);
        arc.j = None;
        let mut file = source(vec![
            GerberStatement::Coordinate(CoordStatement::move_to(Point::new(2.0, 0.0))),
            GerberStatement::Coordinate(arc),
        ]);
        file.rotate(90.0, Point::origin()).unwrap();

        // start (2,0) -> (0,2); center stays at the origin
        let GerberStatement::Coordinate(arc) = file.statements[1] else {
            panic!("expected coordinate");
        };
        assert!(is_equal_value(arc.i.unwrap(), 0.0, 1e-9));
        assert!(is_equal_value(arc.j.unwrap(), -2.0, 1e-9));
        assert!(is_equal_value(arc.x.unwrap(), -2.0, 1e-9));
        assert!(is_equal_value(arc.y.unwrap(), 0.0, 1e-9));
    }

    #[test]
    fn test_full_turn_rotation_is_noop() {
        let mut file = source(vec![ad(ApertureDefinition::rectangle(10, 1.0, 1.0))]);
        let before = file.clone();
        file.rotate(720.0, Point::new(3.0, 3.0)).unwrap();
        assert_eq!(file, before);
    }

    #[test]
    fn test_unit_conversion_is_idempotent() {
        let mut file = source(vec![
            ad(ApertureDefinition::circle(10, 25.4)),
            GerberStatement::Coordinate(CoordStatement::line_to(Point::new(25.4, 50.8))),
        ]);
        file.to_inch();
        let once = file.clone();
        file.to_inch();
        assert_eq!(file, once);
        assert!(is_equal_value(file.apertures().next().unwrap().modifiers[0], 1.0, 1e-12));

        file.to_metric();
        file.to_metric();
        let GerberStatement::Coordinate(coord) = file.statements[1] else {
            panic!("expected coordinate");
        };
        assert!(is_equal_value(coord.y.unwrap(), 50.8, 1e-9));
    }

    #[test]
    fn test_offset_leaves_arc_offsets() {
        let mut file = source(vec![GerberStatement::Coordinate(CoordStatement::arc_to(
            Point::new(1.0, 1.0),
            Point::new(0.5, 0.5),
            false,
        ))]);
        file.offset(10.0, -1.0);
        let GerberStatement::Coordinate(coord) = file.statements[0] else {
            panic!("expected coordinate");
        };
        assert_eq!(coord.x, Some(11.0));
        assert_eq!(coord.y, Some(0.0));
        assert_eq!(coord.i, Some(0.5));
    }
}
