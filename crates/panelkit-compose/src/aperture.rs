//! Aperture definitions and aperture macros.
//!
//! Macro expressions are kept as opaque text. Unit conversion and rotation
//! wrap them in new expressions rather than evaluating them.

use crate::error::{ComposeError, ComposeResult};
use panelkit_core::{format_number, Units, MM_PER_INCH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of an aperture definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApertureShape {
    Circle,
    Rectangle,
    Obround,
    Polygon,
    /// Reference to an aperture macro by name.
    Macro(String),
}

impl ApertureShape {
    pub fn code(&self) -> &str {
        match self {
            Self::Circle => "C",
            Self::Rectangle => "R",
            Self::Obround => "O",
            Self::Polygon => "P",
            Self::Macro(name) => name,
        }
    }

    /// Standard shapes that look different once rotated.
    pub fn is_rotation_variant(&self) -> bool {
        matches!(self, Self::Rectangle | Self::Obround | Self::Polygon)
    }
}

/// `%ADD<code><shape>,<modifiers>*%`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureDefinition {
    pub code: u32,
    pub shape: ApertureShape,
    pub modifiers: Vec<f64>,
}

impl ApertureDefinition {
    pub fn new(code: u32, shape: ApertureShape, modifiers: Vec<f64>) -> Self {
        Self {
            code,
            shape,
            modifiers,
        }
    }

    pub fn circle(code: u32, diameter: f64) -> Self {
        Self::new(code, ApertureShape::Circle, vec![diameter])
    }

    pub fn rectangle(code: u32, width: f64, height: f64) -> Self {
        Self::new(code, ApertureShape::Rectangle, vec![width, height])
    }

    /// Scale the length-valued modifiers.
    ///
    /// Polygon vertex counts and rotations are left alone. Macro parameters
    /// are left alone too: the macro body carries the scaling.
    pub fn scale(&mut self, factor: f64) {
        match self.shape {
            ApertureShape::Circle | ApertureShape::Rectangle | ApertureShape::Obround => {
                for value in &mut self.modifiers {
                    *value *= factor;
                }
            }
            ApertureShape::Polygon => {
                for idx in [0, 3] {
                    if let Some(value) = self.modifiers.get_mut(idx) {
                        *value *= factor;
                    }
                }
            }
            ApertureShape::Macro(_) => {}
        }
    }
}

impl fmt::Display for ApertureDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%ADD{}{}", self.code, self.shape.code())?;
        if !self.modifiers.is_empty() {
            let mods: Vec<String> = self.modifiers.iter().map(|m| format_number(*m)).collect();
            write!(f, ",{}", mods.join("X"))?;
        }
        write!(f, "*%")
    }
}

/// A macro modifier: a literal or an unevaluated expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MacroValue {
    Number(f64),
    Expression(String),
}

impl MacroValue {
    fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(value) => Self::Number(value),
            Err(_) => Self::Expression(text.trim().to_string()),
        }
    }

    fn scaled(&self, units: Units) -> Self {
        match (self, units) {
            (Self::Number(v), Units::Metric) => Self::Number(v * MM_PER_INCH),
            (Self::Number(v), Units::Inch) => Self::Number(v / MM_PER_INCH),
            (Self::Expression(e), Units::Metric) => {
                Self::Expression(format!("({})x{}", e, format_number(MM_PER_INCH)))
            }
            (Self::Expression(e), Units::Inch) => {
                Self::Expression(format!("({})/{}", e, format_number(MM_PER_INCH)))
            }
        }
    }

    fn rotated(&self, angle: f64) -> Self {
        match self {
            Self::Number(v) => Self::Number(v + angle),
            Self::Expression(e) => Self::Expression(format!("({})+{}", e, format_number(angle))),
        }
    }
}

impl fmt::Display for MacroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", format_number(*v)),
            Self::Expression(e) => write!(f, "{}", e),
        }
    }
}

/// One `*`-terminated block of a macro body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MacroContent {
    /// A primitive such as `1,1,$1,0,0` (circle) or `21,...` (center line).
    Primitive { code: u32, modifiers: Vec<MacroValue> },
    /// `$<index>=<expression>`
    Variable { index: u32, expression: String },
    /// `0 <text>`
    Comment(String),
}

impl MacroContent {
    /// Indices of the length-valued modifiers of a primitive.
    fn length_indices(code: u32, count: usize) -> Vec<usize> {
        match code {
            1 => vec![1, 2, 3],
            20 => vec![1, 2, 3, 4, 5],
            21 => vec![1, 2, 3, 4],
            // outline: exposure, vertex count, points..., rotation
            4 => (2..count.saturating_sub(1)).collect(),
            5 => vec![2, 3, 4],
            6 => vec![0, 1, 2, 3, 4, 6, 7],
            7 => vec![0, 1, 2, 3, 4],
            _ => Vec::new(),
        }
    }

    /// Index of the rotation modifier of a primitive.
    fn rotation_index(code: u32, count: usize) -> Option<usize> {
        match code {
            1 => Some(4),
            20 => Some(6),
            21 => Some(5),
            4 => count.checked_sub(1),
            5 => Some(5),
            6 => Some(8),
            7 => Some(5),
            _ => None,
        }
    }

    fn convert_units(&mut self, target: Units) {
        if let Self::Primitive { code, modifiers } = self {
            for idx in Self::length_indices(*code, modifiers.len()) {
                if let Some(value) = modifiers.get_mut(idx) {
                    *value = value.scaled(target);
                }
            }
        }
    }

    fn rotate(&mut self, angle: f64) {
        if let Self::Primitive { code, modifiers } = self {
            let Some(idx) = Self::rotation_index(*code, modifiers.len()) else {
                return;
            };
            while modifiers.len() <= idx {
                modifiers.push(MacroValue::Number(0.0));
            }
            modifiers[idx] = modifiers[idx].rotated(angle);
        }
    }
}

impl fmt::Display for MacroContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive { code, modifiers } => {
                write!(f, "{}", code)?;
                for value in modifiers {
                    write!(f, ",{}", value)?;
                }
                Ok(())
            }
            Self::Variable { index, expression } => write!(f, "${}={}", index, expression),
            Self::Comment(text) => write!(f, "0 {}", text),
        }
    }
}

/// `%AM<name>*<content>*...%`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureMacro {
    pub name: String,
    pub content: Vec<MacroContent>,
}

impl ApertureMacro {
    pub fn new(name: impl Into<String>, content: Vec<MacroContent>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Read a macro body such as `1,1,$1,0,0*1,0,$2,0,0`.
    pub fn parse(name: impl Into<String>, body: &str) -> ComposeResult<Self> {
        let name = name.into();
        let mut content = Vec::new();
        for block in body.split('*').map(str::trim).filter(|b| !b.is_empty()) {
            content.push(parse_block(&name, block)?);
        }
        Ok(Self { name, content })
    }

    /// Body of `MACR`: `$1` width, `$2` height, `$3` hole.
    pub fn rectangle(name: impl Into<String>) -> ComposeResult<Self> {
        Self::parse(name, "21,1,$1,$2,0,0,0*1,0,$3,0,0,0")
    }

    /// Body of `MACLO`, an obround wider than tall.
    pub fn landscape_obround(name: impl Into<String>) -> ComposeResult<Self> {
        Self::parse(
            name,
            "$4=$1-$2*21,1,$4,$2,0,0,0*1,1,$2,$4/2,0,0*1,1,$2,-$4/2,0,0*1,0,$3,0,0,0",
        )
    }

    /// Body of `MACPO`, an obround taller than wide.
    pub fn portrait_obround(name: impl Into<String>) -> ComposeResult<Self> {
        Self::parse(
            name,
            "$4=$2-$1*21,1,$1,$4,0,0,0*1,1,$1,0,$4/2,0*1,1,$1,0,-$4/2,0*1,0,$3,0,0,0",
        )
    }

    /// Body of `MACP`: `$1` diameter, `$2` vertices, `$3` rotation, `$4` hole.
    pub fn polygon(name: impl Into<String>) -> ComposeResult<Self> {
        Self::parse(name, "5,1,$2,0,0,$1,$3*1,0,$4,0,0,0")
    }

    /// Convert every length-valued modifier into `target` units.
    pub fn convert_units(&mut self, target: Units) {
        for content in &mut self.content {
            content.convert_units(target);
        }
    }

    /// Rotate every primitive about the macro origin.
    pub fn rotate(&mut self, angle: f64) {
        for content in &mut self.content {
            content.rotate(angle);
        }
    }
}

impl fmt::Display for ApertureMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%AM{}*", self.name)?;
        for content in &self.content {
            write!(f, "\n{}*", content)?;
        }
        write!(f, "%")
    }
}

fn parse_block(name: &str, block: &str) -> ComposeResult<MacroContent> {
    let invalid = |reason: String| ComposeError::InvalidMacro {
        name: name.to_string(),
        reason,
    };

    if let Some(text) = block.strip_prefix('0') {
        if text.is_empty() || text.starts_with(' ') {
            return Ok(MacroContent::Comment(text.trim().to_string()));
        }
    }

    if let Some(rest) = block.strip_prefix('$') {
        let (index, expression) = rest
            .split_once('=')
            .ok_or_else(|| invalid(format!("variable without assignment: {}", block)))?;
        let index = index
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(format!("bad variable index: {}", block)))?;
        return Ok(MacroContent::Variable {
            index,
            expression: expression.trim().to_string(),
        });
    }

    let mut fields = block.split(',');
    let code = fields
        .next()
        .and_then(|c| c.trim().parse::<u32>().ok())
        .ok_or_else(|| invalid(format!("bad primitive code: {}", block)))?;
    Ok(MacroContent::Primitive {
        code,
        modifiers: fields.map(MacroValue::parse).collect(),
    })
}
