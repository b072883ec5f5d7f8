//! Merging of Gerber layers into one panel layer.

use crate::aperture::{ApertureDefinition, ApertureMacro, ApertureShape};
use crate::dxf::DxfSource;
use crate::error::{ComposeError, ComposeResult};
use crate::gerber::{unique_name, GerberSource, GerberStatement, ParamStatement};
use crate::source::Source;
use panelkit_core::{FileSettings, UnitConversion};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

/// First aperture code handed out; codes below 10 are reserved.
pub const APERTURE_ID_BIAS: u32 = 10;

/// Macros, apertures and draws accepted from one source, committed only
/// once the whole source has been walked.
#[derive(Default)]
struct Staged {
    header: Vec<GerberStatement>,
    macros: Vec<ApertureMacro>,
    apertures: Vec<ApertureDefinition>,
    drawings: Vec<GerberStatement>,
    comments: Vec<String>,
}

/// Gerber layers merged in caller order.
///
/// The first merged source fixes units and header. Apertures are
/// renumbered sequentially from [`APERTURE_ID_BIAS`] and macros are renamed
/// on collision, so sources never clash.
#[derive(Debug, Clone, Default)]
pub struct GerberComposition {
    settings: Option<FileSettings>,
    header: Vec<GerberStatement>,
    macros: Vec<ApertureMacro>,
    apertures: Vec<ApertureDefinition>,
    drawings: Vec<GerberStatement>,
    comments: Vec<String>,
}

impl GerberComposition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> Option<&FileSettings> {
        self.settings.as_ref()
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn macros(&self) -> &[ApertureMacro] {
        &self.macros
    }

    pub fn apertures(&self) -> &[ApertureDefinition] {
        &self.apertures
    }

    /// Draw statements in output order, polarity changes included.
    pub fn drawings(&self) -> &[GerberStatement] {
        &self.drawings
    }

    /// Merge a Gerber or DXF layer.
    pub fn merge(&mut self, source: impl Into<Source>) -> ComposeResult<()> {
        match source.into() {
            Source::Gerber(file) => self.merge_gerber(file),
            Source::Dxf(file) => self.merge_dxf(file),
            other => Err(ComposeError::UnsupportedSource {
                composition: "gerber",
                source_kind: other.kind(),
            }),
        }
    }

    fn next_aperture_code(&self, staged: usize) -> u32 {
        APERTURE_ID_BIAS + (self.apertures.len() + staged) as u32
    }

    fn merge_gerber(&mut self, mut file: GerberSource) -> ComposeResult<()> {
        if !file.settings.is_absolute() {
            return Err(ComposeError::NonAbsoluteNotation(format!(
                "Gerber layer uses {} notation",
                file.settings.notation
            )));
        }
        if let Some(settings) = self.settings {
            file.convert_to(settings.units);
        }

        let mut names: HashSet<String> = self.macros.iter().map(|m| m.name.clone()).collect();
        let mut macro_map: HashMap<String, String> = HashMap::new();
        let mut aperture_map: HashMap<u32, u32> = HashMap::new();
        let mut staged = Staged::default();

        for statement in file.statements {
            match statement {
                GerberStatement::Comment(text) => staged.comments.push(text),
                GerberStatement::Param(ParamStatement::ApertureMacro(mut am)) => {
                    let renamed = unique_name(&am.name, &names);
                    names.insert(renamed.clone());
                    macro_map.insert(am.name.clone(), renamed.clone());
                    am.name = renamed;
                    staged.macros.push(am);
                }
                GerberStatement::Param(ParamStatement::ApertureDefinition(mut ad)) => {
                    if let ApertureShape::Macro(name) = &ad.shape {
                        let renamed = macro_map
                            .get(name)
                            .ok_or_else(|| ComposeError::UnknownMacro(name.clone()))?;
                        ad.shape = ApertureShape::Macro(renamed.clone());
                    }
                    let code = self.next_aperture_code(staged.apertures.len());
                    aperture_map.insert(ad.code, code);
                    ad.code = code;
                    staged.apertures.push(ad);
                }
                GerberStatement::Param(ParamStatement::LevelPolarity(polarity)) => {
                    staged
                        .drawings
                        .push(GerberStatement::Param(ParamStatement::LevelPolarity(polarity)));
                }
                GerberStatement::Param(param) => {
                    staged.header.push(GerberStatement::Param(param));
                }
                GerberStatement::SelectAperture(code) => {
                    let mapped = aperture_map
                        .get(&code)
                        .ok_or(ComposeError::UnknownAperture(code))?;
                    staged.drawings.push(GerberStatement::SelectAperture(*mapped));
                }
                GerberStatement::Eof | GerberStatement::Deprecated(_) => {}
                other => staged.drawings.push(other),
            }
        }

        debug!(
            macros = staged.macros.len(),
            apertures = staged.apertures.len(),
            drawings = staged.drawings.len(),
            "Merged Gerber layer"
        );

        if self.settings.is_none() {
            self.settings = Some(file.settings);
            self.header = staged.header;
        }
        self.macros.extend(staged.macros);
        self.apertures.extend(staged.apertures);
        self.drawings.extend(staged.drawings);
        self.comments.extend(staged.comments);
        Ok(())
    }

    fn merge_dxf(&mut self, mut file: DxfSource) -> ComposeResult<()> {
        file.require_absolute()?;
        if let Some(settings) = self.settings {
            file.convert_to(settings.units);
        }

        let code = self.next_aperture_code(0);
        self.apertures.push(file.aperture(code));
        self.drawings.extend(file.to_gerber_statements(code));
        debug!(aperture = code, mode = ?file.draw_mode(), "Merged DXF layer");

        if self.settings.is_none() {
            self.settings = Some(file.settings);
            self.header = file.gerber_header();
        }
        Ok(())
    }

    /// Header, macros, apertures, draws, then `M02*`.
    pub fn render(&self) -> ComposeResult<String> {
        let settings = self.settings.ok_or(ComposeError::EmptyComposition)?;
        let mut out = String::new();
        for statement in &self.header {
            writeln!(out, "{}", statement.render(&settings))?;
        }
        for am in &self.macros {
            writeln!(out, "{}", am)?;
        }
        for ad in &self.apertures {
            writeln!(out, "{}", ad)?;
        }
        for statement in &self.drawings {
            writeln!(out, "{}", statement.render(&settings))?;
        }
        writeln!(out, "{}", GerberStatement::Eof.render(&settings))?;
        Ok(out)
    }

    pub fn dump(&self, path: impl AsRef<Path>) -> ComposeResult<()> {
        let path = path.as_ref();
        let text = self.render()?;
        std::fs::write(path, text)?;
        info!(
            path = %path.display(),
            apertures = self.apertures.len(),
            macros = self.macros.len(),
            "Wrote Gerber composition"
        );
        Ok(())
    }
}
