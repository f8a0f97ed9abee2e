//! National Consolidator.
//!
//! Stacks the per-source tables, tags each row with its source, re-applies
//! type coercion (stacking can meet an all-null column of one source with a
//! populated one of another) and then the null-fill and dedup passes across
//! the whole national table.

use std::collections::BTreeMap;

use hemoprod_common::column_strings;
use hemoprod_model::{CanonicalSchema, ConsolidationReport, FieldRoles};
use polars::prelude::{Column, DataFrame, DataType};
use tracing::{debug, info, info_span, warn};

use crate::coerce::{CoercionReport, coerce_columns};
use crate::dedupe::{DedupOutcome, deduplicate_latest};
use crate::error::{Result, TransformError};
use crate::fill::fill_integer_nulls;
use crate::reconcile::reconcile_schema;

/// Columns listed in the final type sample.
const TYPE_SAMPLE_SIZE: usize = 10;

/// One normalized table ready for consolidation.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub source_id: String,
    pub data: DataFrame,
}

impl SourceFrame {
    pub fn new(source_id: impl Into<String>, data: DataFrame) -> Self {
        Self {
            source_id: source_id.into(),
            data,
        }
    }
}

/// The national table and what consolidation did to it.
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub data: DataFrame,
    pub report: ConsolidationReport,
    pub coercion: CoercionReport,
    pub dedup: DedupOutcome,
}

/// Turn a column into text in every frame when frames disagree on its type.
fn harmonize_dtypes(frames: &mut [SourceFrame], schema: &CanonicalSchema) -> Result<usize> {
    let mut harmonized = 0usize;
    for name in schema.names() {
        let mut dtypes: Vec<DataType> = Vec::with_capacity(frames.len());
        for frame in frames.iter() {
            let dtype = frame.data.column(name)?.dtype();
            if !dtypes.contains(dtype) {
                dtypes.push(dtype.clone());
            }
        }
        if dtypes.len() < 2 {
            continue;
        }
        debug!(column = name, dtypes = ?dtypes, "storage types differ across sources");
        harmonized += 1;
        for frame in frames.iter_mut() {
            let column = frame.data.column(name)?;
            if column.dtype() == &DataType::String {
                continue;
            }
            let text = Column::new(name.into(), column_strings(column)?);
            frame.data.with_column(text)?;
        }
    }
    Ok(harmonized)
}

fn rows_per_source(df: &DataFrame, provenance_column: &str) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for value in column_strings(df.column(provenance_column)?)? {
        *counts.entry(value.unwrap_or_default()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Consolidate normalized per-source tables into the national table.
///
/// Fails with [`TransformError::NoUsableSources`] when `frames` is empty.
pub fn consolidate(
    frames: Vec<SourceFrame>,
    schema: &CanonicalSchema,
    roles: &FieldRoles,
    provenance_column: &str,
) -> Result<Consolidated> {
    let _span = info_span!("consolidate", sources = frames.len()).entered();
    if frames.is_empty() {
        return Err(TransformError::NoUsableSources);
    }
    if schema.contains(provenance_column) {
        return Err(TransformError::ProvenanceCollision {
            column: provenance_column.to_string(),
        });
    }

    let mut aligned = Vec::with_capacity(frames.len());
    for frame in frames {
        let (data, report) = reconcile_schema(&frame.data, schema)?;
        if !report.extra.is_empty() || !report.missing.is_empty() {
            warn!(
                source_id = %frame.source_id,
                extra = report.extra.len(),
                missing = report.missing.len(),
                "per-source table was not schema-aligned"
            );
        }
        aligned.push(SourceFrame::new(frame.source_id, data));
    }
    let harmonized = harmonize_dtypes(&mut aligned, schema)?;

    let mut stacked: Option<DataFrame> = None;
    for frame in aligned {
        let mut data = frame.data;
        let tag = vec![frame.source_id.as_str(); data.height()];
        data.with_column(Column::new(provenance_column.into(), tag))?;
        match stacked.as_mut() {
            Some(combined) => {
                combined.vstack_mut(&data)?;
            }
            None => stacked = Some(data),
        }
    }
    let mut combined = stacked.ok_or(TransformError::NoUsableSources)?;
    let stacked_rows = combined.height();

    let coercion = coerce_columns(&mut combined, schema, &[provenance_column])?;
    let fill = fill_integer_nulls(&mut combined, schema)?;
    let (data, dedup) =
        deduplicate_latest(&combined, &roles.dedup_key(), &roles.submitted_at)?;

    let column_types_sample: BTreeMap<String, String> = data
        .get_columns()
        .iter()
        .take(TYPE_SAMPLE_SIZE)
        .map(|column| (column.name().to_string(), column.dtype().to_string()))
        .collect();
    let report = ConsolidationReport {
        total_rows: data.height(),
        total_columns: data.width(),
        rows_per_source: rows_per_source(&data, provenance_column)?,
        duplicates_removed: dedup.removed(),
        coercion_fallbacks: coercion.fallbacks.len(),
        output: None,
        output_bytes: None,
        column_types_sample,
    };

    info!(
        stacked_rows,
        total_rows = report.total_rows,
        total_columns = report.total_columns,
        harmonized_columns = harmonized,
        coercion_fallbacks = report.coercion_fallbacks,
        null_cells_filled = fill.cells,
        duplicates_removed = report.duplicates_removed,
        "national table consolidated"
    );
    for (source_id, rows) in &report.rows_per_source {
        info!(source_id = %source_id, rows, "rows per source");
    }
    for column in data.get_columns().iter().take(TYPE_SAMPLE_SIZE) {
        info!(column = %column.name(), dtype = %column.dtype(), "final column type");
    }

    Ok(Consolidated {
        data,
        report,
        coercion,
        dedup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemoprod_model::{CanonicalFieldSpec, DeclaredType};

    #[test]
    fn empty_input_is_fatal() {
        let schema =
            CanonicalSchema::new(vec![CanonicalFieldSpec::new("cnpj", DeclaredType::Text)])
                .unwrap();
        let err = consolidate(Vec::new(), &schema, &FieldRoles::default(), "source_id")
            .unwrap_err();
        assert!(matches!(err, TransformError::NoUsableSources));
    }

    #[test]
    fn provenance_must_not_shadow_schema() {
        let schema =
            CanonicalSchema::new(vec![CanonicalFieldSpec::new("uf", DeclaredType::Text)]).unwrap();
        let frame = SourceFrame::new("al", DataFrame::empty());
        let err = consolidate(vec![frame], &schema, &FieldRoles::default(), "uf").unwrap_err();
        assert!(matches!(err, TransformError::ProvenanceCollision { .. }));
    }
}
