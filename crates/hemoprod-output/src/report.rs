use std::fs;
use std::path::Path;

use hemoprod_model::RunReport;
use tracing::info;

use crate::error::{OutputError, Result};
use crate::files::ensure_parent_dir;

/// Write the run report as pretty-printed JSON.
pub fn write_run_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(|source| OutputError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    ensure_parent_dir(path)?;
    fs::write(path, json).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), sources = report.sources.len(), "run report written");
    Ok(())
}
