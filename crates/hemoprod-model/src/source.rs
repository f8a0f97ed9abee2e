use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One configured regional source: a spreadsheet and the sheet to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Short identifier stored in the provenance column (e.g. "ce").
    pub id: String,
    /// Human readable region name.
    #[serde(default)]
    pub name: Option<String>,
    /// File name, relative to the raw data directory unless absolute.
    pub file: PathBuf,
    /// Sheet name for workbooks; `None` reads the first sheet.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl SourceSpec {
    pub fn new(id: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: None,
            file: file.into(),
            sheet: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Region name when known, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{} [{}]", self.file.display(), sheet),
            None => write!(f, "{}", self.file.display()),
        }
    }
}
