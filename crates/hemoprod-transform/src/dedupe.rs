//! Deduplicator: keep the latest submission of each logical report.

use std::collections::HashMap;

use hemoprod_common::column_strings;
use hemoprod_model::DeclaredType;
use polars::prelude::{DataFrame, DataType, IdxCa, IdxSize};
use tracing::{debug, error, warn};

use crate::coerce::{TIMESTAMP_DTYPE, coerce_column};
use crate::error::Result;

/// Dedup was not performed because required columns are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationSkipped {
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    Deduplicated { removed: usize },
    Skipped(DeduplicationSkipped),
}

impl DedupOutcome {
    pub fn removed(&self) -> usize {
        match self {
            DedupOutcome::Deduplicated { removed } => *removed,
            DedupOutcome::Skipped(_) => 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DedupOutcome::Skipped(_))
    }
}

/// Row order after a stable ascending sort on timestamps, nulls first.
///
/// Equal timestamps keep their input order, so the later row sorts last.
fn ascending_order(timestamps: &[Option<i64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    order.sort_by_key(|&idx| timestamps[idx]);
    order
}

/// Rows that come last for their key under `order`, kept in that order.
fn survivors(keys: &[Vec<Option<String>>], order: &[usize]) -> Vec<usize> {
    let mut last: HashMap<&[Option<String>], usize> = HashMap::with_capacity(keys.len());
    for (position, &row) in order.iter().enumerate() {
        last.insert(keys[row].as_slice(), position);
    }
    order
        .iter()
        .enumerate()
        .filter(|(position, row)| last.get(keys[**row].as_slice()) == Some(position))
        .map(|(_, &row)| row)
        .collect()
}

/// Keep one row per key: the one with the latest `timestamp`.
///
/// The output is ordered by ascending timestamp. Null key cells compare
/// equal to each other. When a key or timestamp column is missing the table
/// passes through unchanged with [`DedupOutcome::Skipped`].
pub fn deduplicate_latest(
    df: &DataFrame,
    key: &[&str],
    timestamp: &str,
) -> Result<(DataFrame, DedupOutcome)> {
    let missing: Vec<String> = key
        .iter()
        .copied()
        .chain(std::iter::once(timestamp))
        .filter(|name| df.column(name).is_err())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        error!(
            missing = %missing.join(", "),
            "columns required for deduplication not found; skipping deduplication"
        );
        return Ok((
            df.clone(),
            DedupOutcome::Skipped(DeduplicationSkipped { missing }),
        ));
    }

    let mut df = df.clone();
    let stamp = df.column(timestamp)?;
    if !matches!(stamp.dtype(), DataType::Datetime(_, _)) {
        warn!(
            column = timestamp,
            dtype = %stamp.dtype(),
            "timestamp column is not a datetime; converting before deduplication"
        );
        let converted = coerce_column(stamp, DeclaredType::Timestamp)?;
        df.with_column(converted)?;
    }
    let millis = df
        .column(timestamp)?
        .cast(&TIMESTAMP_DTYPE)?
        .cast(&DataType::Int64)?;
    let timestamps: Vec<Option<i64>> = millis.as_materialized_series().i64()?.into_iter().collect();

    let key_values = key
        .iter()
        .map(|name| column_strings(df.column(name)?))
        .collect::<polars::prelude::PolarsResult<Vec<_>>>()?;
    let keys: Vec<Vec<Option<String>>> = (0..df.height())
        .map(|row| key_values.iter().map(|values| values[row].clone()).collect())
        .collect();

    let order = ascending_order(&timestamps);
    let kept = survivors(&keys, &order);
    let removed = df.height() - kept.len();
    let indices: Vec<IdxSize> = kept.iter().map(|&row| row as IdxSize).collect();
    let deduplicated = df.take(&IdxCa::from_vec("idx".into(), indices))?;

    debug!(removed, kept = deduplicated.height(), "deduplicated by latest submission");
    Ok((deduplicated, DedupOutcome::Deduplicated { removed }))
}
