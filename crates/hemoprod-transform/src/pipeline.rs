//! Per-source stage sequence.
//!
//! Runs normalize, split, coerce, reconcile, fill and dedupe in that order on
//! one source table, recording the metrics of every stage. Which source the
//! table came from is the caller's concern; the driver wraps this call in a
//! `source` span so every event below is attributed to it.

use hemoprod_model::{AliasMap, CanonicalSchema, FieldRoles, SourceMetrics};
use polars::prelude::DataFrame;
use thiserror::Error;
use tracing::{info, info_span};

use crate::coerce::coerce_columns;
use crate::dedupe::{DedupOutcome, deduplicate_latest};
use crate::error::TransformError;
use crate::fill::fill_integer_nulls;
use crate::normalize::normalize_columns;
use crate::reconcile::reconcile_schema;
use crate::split::{split_locality_region, split_period_year};

/// Reference data shared read-only by every source run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    pub schema: &'a CanonicalSchema,
    pub aliases: &'a AliasMap,
    pub roles: &'a FieldRoles,
}

impl<'a> PipelineContext<'a> {
    pub fn new(schema: &'a CanonicalSchema, aliases: &'a AliasMap, roles: &'a FieldRoles) -> Self {
        Self {
            schema,
            aliases,
            roles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Normalize,
    Split,
    Coerce,
    Reconcile,
    Fill,
    Dedupe,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Normalize,
        Stage::Split,
        Stage::Coerce,
        Stage::Reconcile,
        Stage::Fill,
        Stage::Dedupe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Split => "split",
            Stage::Coerce => "coerce",
            Stage::Reconcile => "reconcile",
            Stage::Fill => "fill",
            Stage::Dedupe => "dedupe",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure, tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: TransformError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> AtStage<T> for crate::error::Result<T> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

/// One source's schema-correct table and its audit metrics.
#[derive(Debug, Clone)]
pub struct NormalizedSource {
    pub data: DataFrame,
    pub metrics: SourceMetrics,
    pub dedup: DedupOutcome,
}

/// Run every stage on one source table.
pub fn normalize_source(
    df: &DataFrame,
    ctx: &PipelineContext<'_>,
) -> Result<NormalizedSource, StageError> {
    let mut metrics = SourceMetrics {
        original_columns: df.width(),
        original_rows: df.height(),
        ..SourceMetrics::default()
    };
    info!(
        original_rows = metrics.original_rows,
        original_columns = metrics.original_columns,
        "source table loaded"
    );

    let (mut data, normalization) = {
        let _span = info_span!("normalize").entered();
        normalize_columns(df, ctx.schema, ctx.aliases).at(Stage::Normalize)?
    };
    metrics.cleaned_labels = normalization.cleaned;
    metrics.renamed_columns = normalization.renamed.len();
    metrics.collided_columns = normalization.collisions.len();

    {
        let _span = info_span!("split").entered();
        let roles = ctx.roles;
        let period = split_period_year(&mut data, &roles.reference_period, &roles.reference_year)
            .at(Stage::Split)?;
        let locality =
            split_locality_region(&mut data, &roles.locality, &roles.region).at(Stage::Split)?;
        metrics.period_year_splits = period.rows_split;
        metrics.period_year_conflicts = period.conflicts;
        metrics.locality_region_splits = locality.rows_split;
        metrics.locality_region_conflicts = locality.conflicts;
    }

    {
        let _span = info_span!("coerce").entered();
        let coercion = coerce_columns(&mut data, ctx.schema, &[]).at(Stage::Coerce)?;
        metrics.coercion_fallbacks = coercion.fallbacks.len();
    }

    let mut data = {
        let _span = info_span!("reconcile").entered();
        let (data, reconcile) = reconcile_schema(&data, ctx.schema).at(Stage::Reconcile)?;
        metrics.columns_added = reconcile.missing.len();
        metrics.columns_removed = reconcile.extra.len() + metrics.collided_columns;
        data
    };

    {
        let _span = info_span!("fill").entered();
        let fill = fill_integer_nulls(&mut data, ctx.schema).at(Stage::Fill)?;
        metrics.null_cells_filled = fill.cells;
    }

    let (data, dedup) = {
        let _span = info_span!("dedupe").entered();
        deduplicate_latest(&data, &ctx.roles.dedup_key(), &ctx.roles.submitted_at)
            .at(Stage::Dedupe)?
    };
    metrics.duplicates_removed = dedup.removed();
    metrics.dedup_skipped = dedup.is_skipped();
    metrics.final_columns = data.width();
    metrics.final_rows = data.height();

    info!(
        original_rows = metrics.original_rows,
        original_columns = metrics.original_columns,
        columns_added = metrics.columns_added,
        columns_removed = metrics.columns_removed,
        coercion_fallbacks = metrics.coercion_fallbacks,
        null_cells_filled = metrics.null_cells_filled,
        duplicates_removed = metrics.duplicates_removed,
        final_columns = metrics.final_columns,
        final_rows = metrics.final_rows,
        "source normalized"
    );

    Ok(NormalizedSource {
        data,
        metrics,
        dedup,
    })
}
