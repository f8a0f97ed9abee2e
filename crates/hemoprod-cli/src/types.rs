use std::path::PathBuf;

use hemoprod_model::RunReport;

use crate::config::Config;

/// Everything a national run needs, after config and flags are merged.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub config: Config,
    /// Enumerate spreadsheets in the raw directory instead of the configured list.
    pub discover: bool,
    /// Restrict the run to these source ids.
    pub only: Vec<String>,
    pub dry_run: bool,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunResult {
    pub report: RunReport,
    pub output: Option<PathBuf>,
    pub csv_output: Option<PathBuf>,
    pub per_source_outputs: Vec<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Label coverage of one source against the dictionaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAudit {
    pub source_id: String,
    /// `None` when the source was read; otherwise why it was not.
    pub problem: Option<String>,
    pub columns: usize,
    /// Cleaned labels that are neither canonical nor aliased.
    pub unaliased: Vec<String>,
    /// Canonical fields no column maps to; they would be synthesized.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePresence {
    pub source_id: String,
    pub name: String,
    pub path: PathBuf,
    pub sheet: Option<String>,
    pub state: PresenceState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceState {
    Present,
    Missing(String),
    Unreadable(String),
}

impl PresenceState {
    pub fn label(&self) -> &'static str {
        match self {
            PresenceState::Present => "present",
            PresenceState::Missing(_) => "missing",
            PresenceState::Unreadable(_) => "unreadable",
        }
    }
}
