//! Closed set of mergeable source layers.

use crate::dxf::DxfSource;
use crate::excellon::ExcellonSource;
use crate::gerber::GerberSource;
use panelkit_core::{UnitConversion, Units};

/// A layer ready to be merged into a composition.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Gerber(GerberSource),
    Excellon(ExcellonSource),
    Dxf(DxfSource),
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Gerber(_) => "gerber",
            Self::Excellon(_) => "excellon",
            Self::Dxf(_) => "dxf",
        }
    }

    pub fn units(&self) -> Units {
        match self {
            Self::Gerber(s) => s.units(),
            Self::Excellon(s) => s.units(),
            Self::Dxf(s) => s.units(),
        }
    }
}

impl From<GerberSource> for Source {
    fn from(source: GerberSource) -> Self {
        Self::Gerber(source)
    }
}

impl From<ExcellonSource> for Source {
    fn from(source: ExcellonSource) -> Self {
        Self::Excellon(source)
    }
}

impl From<DxfSource> for Source {
    fn from(source: DxfSource) -> Self {
        Self::Dxf(source)
    }
}
