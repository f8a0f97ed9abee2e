//! Per-source and national audit metrics.
//!
//! These values are logged during a run and serialized into the optional
//! JSON run report, so every dropped column, zeroed null and skipped source
//! can be audited after the fact.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Counts collected while one source moves through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetrics {
    pub original_columns: usize,
    pub original_rows: usize,
    /// Labels changed by whitespace/invisible-character cleanup.
    pub cleaned_labels: usize,
    /// Columns renamed through the alias map.
    pub renamed_columns: usize,
    /// Columns dropped because an earlier column already took their name.
    pub collided_columns: usize,
    pub period_year_splits: usize,
    pub period_year_conflicts: usize,
    pub locality_region_splits: usize,
    pub locality_region_conflicts: usize,
    /// Columns stored as text after a failed coercion.
    pub coercion_fallbacks: usize,
    /// Canonical columns synthesized because the source lacked them.
    pub columns_added: usize,
    /// Non-canonical columns dropped by reconciliation (collisions included).
    pub columns_removed: usize,
    pub final_columns: usize,
    pub null_cells_filled: usize,
    pub duplicates_removed: usize,
    pub dedup_skipped: bool,
    pub final_rows: usize,
}

/// How a source ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Processed,
    /// File or sheet legitimately absent.
    Skipped { reason: String },
    /// Read or processing failure, isolated to this source.
    Failed { stage: String, error: String },
}

impl SourceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SourceStatus::Processed => "processed",
            SourceStatus::Skipped { .. } => "skipped",
            SourceStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: String,
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub metrics: Option<SourceMetrics>,
    /// Per-source artifact that could not be written; the table was still consolidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
}

/// Totals of the national table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub rows_per_source: BTreeMap<String, usize>,
    /// Rows removed by the cross-source dedup pass.
    pub duplicates_removed: usize,
    pub coercion_fallbacks: usize,
    pub output: Option<PathBuf>,
    pub output_bytes: Option<u64>,
    /// Stored dtype of a few leading columns, for the summary log.
    pub column_types_sample: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub consolidation: Option<ConsolidationReport>,
}

impl RunReport {
    pub fn processed_count(&self) -> usize {
        self.count(|status| matches!(status, SourceStatus::Processed))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|status| matches!(status, SourceStatus::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|status| matches!(status, SourceStatus::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&SourceStatus) -> bool) -> usize {
        self.sources
            .iter()
            .filter(|report| predicate(&report.status))
            .count()
    }
}
