use std::fmt;
use std::str::FromStr;

use brine_sbe_schema::{CompositeLayout, EnumLayout, MessageLayout, SchemaLayout, SetLayout};
use serde::{Deserialize, Serialize};

use crate::error::SbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    TypeScript,
    Python,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Rust, Language::TypeScript, Language::Python];

    pub fn name(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rust" | "rs" => Ok(Language::Rust),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "python" | "py" => Ok(Language::Python),
            other => Err(format!("unknown target language \"{}\"", other)),
        }
    }
}

/// One generated source file, relative to the output package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub file_name: String,
    pub contents: String,
}

impl GeneratedUnit {
    pub fn new(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        GeneratedUnit {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// The file name without its extension, which is also the module name
    /// other units import it by.
    pub fn stem(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(dot) => &self.file_name[..dot],
            None => &self.file_name,
        }
    }
}

/// A backend renderer. Each call renders one schema element into one unit;
/// the driver decides the order and where the units go.
pub trait CodeGenerator {
    fn language(&self) -> Language;

    fn render_composite(&self, schema: &SchemaLayout, composite: &CompositeLayout) -> Result<GeneratedUnit, SbeError>;

    fn render_enum(&self, schema: &SchemaLayout, layout: &EnumLayout) -> Result<GeneratedUnit, SbeError>;

    fn render_set(&self, schema: &SchemaLayout, layout: &SetLayout) -> Result<GeneratedUnit, SbeError>;

    fn render_message(&self, schema: &SchemaLayout, message: &MessageLayout) -> Result<GeneratedUnit, SbeError>;

    /// Shared helpers the other units depend on, if the language needs them.
    fn render_support(&self, _schema: &SchemaLayout) -> Result<Option<GeneratedUnit>, SbeError> {
        Ok(None)
    }

    /// A module index over everything rendered so far (`mod.rs`,
    /// `index.ts`, `__init__.py`).
    fn render_index(&self, _schema: &SchemaLayout, _units: &[GeneratedUnit]) -> Result<Option<GeneratedUnit>, SbeError> {
        Ok(None)
    }
}
