//! Per-source driver and the national run.
//!
//! Sources are processed one at a time. Anything that goes wrong with a
//! single source is logged and recorded in its [`SourceReport`]; only
//! reference data loading, an empty consolidation and writing the national
//! table end the run with an error.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use hemoprod_ingest::{
    IngestError, builtin_sources, discover_sources, locate_source, read_source,
};
use hemoprod_model::{
    AliasMap, CanonicalSchema, ConsolidationReport, RunReport, SourceReport, SourceSpec, SourceStatus,
    normalize_label,
};
use hemoprod_output::{write_csv, write_parquet, write_per_source, write_run_report};
use hemoprod_standards::{ReferenceData, load_reference_data};
use hemoprod_transform::{
    NormalizedSource, PipelineContext, SourceFrame, consolidate, normalize_source, resolve_label,
};
use tracing::{error, info, info_span, warn};

use crate::config::Config;
use crate::types::{PresenceState, RunResult, RunSettings, SourceAudit, SourcePresence};

/// Stage name recorded for failures before normalization starts.
const READ_STAGE: &str = "read";

/// Result of driving one source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub report: SourceReport,
    pub normalized: Option<NormalizedSource>,
}

/// Path a source file resolves to under `raw_dir`.
pub fn source_path(spec: &SourceSpec, raw_dir: &Path) -> PathBuf {
    if spec.file.is_absolute() {
        spec.file.clone()
    } else {
        raw_dir.join(&spec.file)
    }
}

/// Sources for this run: discovered, configured or built-in, then filtered.
pub fn select_sources(config: &Config, discover: bool, only: &[String]) -> Result<Vec<SourceSpec>> {
    let sources = if discover {
        discover_sources(&config.paths.raw_dir).with_context(|| {
            format!("discover sources in {}", config.paths.raw_dir.display())
        })?
    } else if config.sources.is_empty() {
        builtin_sources()
    } else {
        config.sources.clone()
    };
    if only.is_empty() {
        return Ok(sources);
    }
    let wanted: HashSet<String> = only.iter().map(|id| id.trim().to_lowercase()).collect();
    let selected: Vec<SourceSpec> = sources
        .into_iter()
        .filter(|spec| wanted.contains(&spec.id.to_lowercase()))
        .collect();
    if selected.len() < wanted.len() {
        warn!(
            requested = wanted.len(),
            matched = selected.len(),
            "some requested source ids are not configured"
        );
    }
    Ok(selected)
}

fn missing_report(spec: &SourceSpec, path: PathBuf, err: &IngestError) -> SourceReport {
    warn!(error = %err, "source not available; skipping");
    SourceReport {
        source_id: spec.id.clone(),
        name: spec.display_name().to_string(),
        path,
        status: SourceStatus::Skipped {
            reason: err.to_string(),
        },
        metrics: None,
        write_error: None,
    }
}

fn failed_report(
    spec: &SourceSpec,
    path: PathBuf,
    stage: &str,
    err: &dyn std::fmt::Display,
) -> SourceReport {
    error!(stage, error = %err, "source failed; continuing with the next source");
    SourceReport {
        source_id: spec.id.clone(),
        name: spec.display_name().to_string(),
        path,
        status: SourceStatus::Failed {
            stage: stage.to_string(),
            error: err.to_string(),
        },
        metrics: None,
        write_error: None,
    }
}

/// Locate, read and normalize one source without ever failing the run.
pub fn process_source(
    spec: &SourceSpec,
    raw_dir: &Path,
    ctx: &PipelineContext<'_>,
) -> SourceOutcome {
    let span = info_span!("source", source_id = %spec.id);
    let _guard = span.enter();
    let start = Instant::now();
    let path = source_path(spec, raw_dir);

    if let Err(err) = locate_source(spec, raw_dir) {
        let report = if err.is_missing() {
            missing_report(spec, path, &err)
        } else {
            failed_report(spec, path, READ_STAGE, &err)
        };
        return SourceOutcome {
            report,
            normalized: None,
        };
    }

    info!(path = %path.display(), sheet = ?spec.sheet, "reading source");
    let table = match read_source(spec, raw_dir) {
        Ok(table) => table,
        Err(err) if err.is_missing() => {
            return SourceOutcome {
                report: missing_report(spec, path, &err),
                normalized: None,
            };
        }
        Err(err) => {
            return SourceOutcome {
                report: failed_report(spec, path, READ_STAGE, &err),
                normalized: None,
            };
        }
    };

    match normalize_source(&table.data, ctx) {
        Ok(normalized) => {
            info!(
                final_rows = normalized.metrics.final_rows,
                duration_ms = start.elapsed().as_millis(),
                "source processed"
            );
            SourceOutcome {
                report: SourceReport {
                    source_id: spec.id.clone(),
                    name: spec.display_name().to_string(),
                    path: table.path,
                    status: SourceStatus::Processed,
                    metrics: Some(normalized.metrics.clone()),
                    write_error: None,
                },
                normalized: Some(normalized),
            }
        }
        Err(err) => SourceOutcome {
            report: failed_report(spec, table.path, err.stage.as_str(), &err.source),
            normalized: None,
        },
    }
}

/// Write one source's processed table, recording a failure on its report.
fn write_source_artifact(
    normalized: &NormalizedSource,
    report: &mut SourceReport,
    dir: &Path,
) -> Option<PathBuf> {
    let span = info_span!("source", source_id = %report.source_id);
    let _guard = span.enter();
    match write_per_source(&normalized.data, dir, &report.source_id) {
        Ok(path) => Some(path),
        Err(err) => {
            error!(
                dir = %dir.display(),
                error = %err,
                "processed table not written; source still consolidated"
            );
            report.write_error = Some(err.to_string());
            None
        }
    }
}

fn load_reference(config: &Config) -> Result<ReferenceData> {
    load_reference_data(&config.paths.schema, &config.paths.aliases)
        .context("load reference dictionaries")
}

fn finish_report(
    settings: &RunSettings,
    sources: Vec<SourceReport>,
    consolidation: Option<ConsolidationReport>,
) -> Result<RunReport> {
    let report = RunReport {
        sources,
        consolidation,
    };
    if let Some(path) = &settings.report_path
        && !settings.dry_run
    {
        write_run_report(&report, path).context("write run report")?;
    }
    Ok(report)
}

/// Process every source and write the national table.
pub fn run_national(settings: &RunSettings) -> Result<RunResult> {
    let config = &settings.config;
    let reference = load_reference(config)?;
    let sources = select_sources(config, settings.discover, &settings.only)?;
    let ctx = PipelineContext::new(&reference.schema, &reference.aliases, &config.fields);
    info!(
        sources = sources.len(),
        raw_dir = %config.paths.raw_dir.display(),
        schema_fields = reference.schema.len(),
        aliases = reference.aliases.len(),
        dry_run = settings.dry_run,
        "starting national run"
    );

    let mut reports = Vec::with_capacity(sources.len());
    let mut frames = Vec::new();
    let mut per_source_outputs = Vec::new();
    for spec in &sources {
        let SourceOutcome {
            mut report,
            normalized,
        } = process_source(spec, &config.paths.raw_dir, &ctx);
        if let Some(normalized) = normalized {
            if let Some(dir) = &config.paths.per_source_dir
                && !settings.dry_run
                && let Some(path) = write_source_artifact(&normalized, &mut report, dir)
            {
                per_source_outputs.push(path);
            }
            frames.push(SourceFrame::new(spec.id.clone(), normalized.data));
        }
        reports.push(report);
    }

    let processed = frames.len();
    info!(
        processed,
        skipped_or_failed = reports.len() - processed,
        "source processing complete"
    );

    let consolidated = match consolidate(
        frames,
        &reference.schema,
        &config.fields,
        &config.output.provenance_column,
    ) {
        Ok(consolidated) => consolidated,
        Err(err) => {
            error!(error = %err, "consolidation failed; no output written");
            finish_report(settings, reports, None)?;
            return Err(err).context("consolidate national table");
        }
    };

    let mut summary = consolidated.report;
    let output = if settings.dry_run {
        info!(path = %config.paths.output.display(), "dry run; national table not written");
        None
    } else {
        let bytes = write_parquet(&consolidated.data, &config.paths.output)
            .context("write national table")?;
        summary.output = Some(config.paths.output.clone());
        summary.output_bytes = Some(bytes);
        Some(config.paths.output.clone())
    };
    let csv_output = match &config.paths.csv {
        Some(path) if !settings.dry_run => {
            write_csv(&consolidated.data, path).context("write national csv")?;
            Some(path.clone())
        }
        _ => None,
    };

    let report = finish_report(settings, reports, Some(summary))?;
    Ok(RunResult {
        report,
        output,
        csv_output,
        per_source_outputs,
        report_path: settings.report_path.clone().filter(|_| !settings.dry_run),
        dry_run: settings.dry_run,
    })
}

/// Label coverage of one source's header row.
pub fn audit_columns(
    source_id: &str,
    labels: &[String],
    schema: &CanonicalSchema,
    aliases: &AliasMap,
) -> SourceAudit {
    let mut covered = HashSet::new();
    let mut unaliased = Vec::new();
    for label in labels {
        let cleaned = normalize_label(label);
        let target = resolve_label(&cleaned, schema, aliases);
        if schema.contains(target) {
            covered.insert(target.to_string());
        } else {
            unaliased.push(cleaned);
        }
    }
    let missing = schema
        .names()
        .filter(|name| !covered.contains(*name))
        .map(str::to_string)
        .collect();
    SourceAudit {
        source_id: source_id.to_string(),
        problem: None,
        columns: labels.len(),
        unaliased,
        missing,
    }
}

/// Read every source and report label coverage without writing anything.
pub fn run_audit(settings: &RunSettings) -> Result<Vec<SourceAudit>> {
    let config = &settings.config;
    let reference = load_reference(config)?;
    let sources = select_sources(config, settings.discover, &settings.only)?;
    let mut audits = Vec::with_capacity(sources.len());
    for spec in &sources {
        let _guard = info_span!("source", source_id = %spec.id).entered();
        match read_source(spec, &config.paths.raw_dir) {
            Ok(table) => {
                let labels: Vec<String> = table
                    .data
                    .get_column_names()
                    .into_iter()
                    .map(|name| name.to_string())
                    .collect();
                let audit = audit_columns(&spec.id, &labels, &reference.schema, &reference.aliases);
                info!(
                    columns = audit.columns,
                    unaliased = audit.unaliased.len(),
                    missing = audit.missing.len(),
                    "source audited"
                );
                audits.push(audit);
            }
            Err(err) => {
                warn!(error = %err, "source not audited");
                audits.push(SourceAudit {
                    source_id: spec.id.clone(),
                    problem: Some(err.to_string()),
                    columns: 0,
                    unaliased: Vec::new(),
                    missing: Vec::new(),
                });
            }
        }
    }
    Ok(audits)
}

/// Whether each selected source's file and sheet exist.
pub fn run_sources(settings: &RunSettings) -> Result<Vec<SourcePresence>> {
    let config = &settings.config;
    let sources = select_sources(config, settings.discover, &settings.only)?;
    Ok(sources
        .iter()
        .map(|spec| {
            let state = match locate_source(spec, &config.paths.raw_dir) {
                Ok(_) => PresenceState::Present,
                Err(err) if err.is_missing() => PresenceState::Missing(err.to_string()),
                Err(err) => PresenceState::Unreadable(err.to_string()),
            };
            SourcePresence {
                source_id: spec.id.clone(),
                name: spec.display_name().to_string(),
                path: source_path(spec, &config.paths.raw_dir),
                sheet: spec.sheet.clone(),
                state,
            }
        })
        .collect())
}
