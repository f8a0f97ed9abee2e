//! Schema Reconciler.

use hemoprod_model::{CanonicalSchema, DeclaredType};
use polars::prelude::{Column, DataFrame, DataType};
use tracing::info;

use crate::coerce::TIMESTAMP_DTYPE;
use crate::error::Result;

/// Example names printed per set in reconciliation logs.
const SAMPLE_SIZE: usize = 10;

/// Set differences between a table and the canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Dropped columns, in source order.
    pub extra: Vec<String>,
    /// Synthesized columns, in canonical order.
    pub missing: Vec<String>,
}

/// Comma-separated names, truncated after `limit` with a remainder count.
///
/// ```
/// use hemoprod_transform::sample_names;
///
/// let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
/// assert_eq!(sample_names(&names, 5), "a, b, c");
/// assert_eq!(sample_names(&names, 2), "a, b (+1 more)");
/// ```
pub fn sample_names(names: &[String], limit: usize) -> String {
    let mut sample = names
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > limit {
        sample.push_str(&format!(" (+{} more)", names.len() - limit));
    }
    sample
}

/// Full column of the type-appropriate empty value for a missing field.
///
/// Counts and decimals start at zero, timestamps at null and text at the
/// empty string.
pub fn default_column(name: &str, declared_type: DeclaredType, height: usize) -> Column {
    match declared_type {
        DeclaredType::Integer => Column::new(name.into(), vec![0i64; height]),
        DeclaredType::Decimal => Column::new(name.into(), vec![0f64; height]),
        DeclaredType::Timestamp => Column::full_null(name.into(), height, &TIMESTAMP_DTYPE),
        DeclaredType::Text => Column::new(name.into(), vec![""; height]),
    }
}

/// Storage type a column of `declared_type` has after coercion.
pub fn storage_dtype(declared_type: DeclaredType) -> DataType {
    match declared_type {
        DeclaredType::Integer => DataType::Int64,
        DeclaredType::Decimal => DataType::Float64,
        DeclaredType::Timestamp => TIMESTAMP_DTYPE,
        DeclaredType::Text => DataType::String,
    }
}

/// Make the column set equal the canonical schema, in canonical order.
pub fn reconcile_schema(
    df: &DataFrame,
    schema: &CanonicalSchema,
) -> Result<(DataFrame, ReconcileReport)> {
    let height = df.height();
    let extra: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| !schema.contains(name.as_str()))
        .map(|name| name.to_string())
        .collect();

    let mut missing = Vec::new();
    let mut columns = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        match df.column(&field.name) {
            Ok(column) => columns.push(column.clone()),
            Err(_) => {
                missing.push(field.name.clone());
                columns.push(default_column(&field.name, field.declared_type, height));
            }
        }
    }

    info!(
        columns_removed = extra.len(),
        columns_added = missing.len(),
        "schema reconciled"
    );
    if !extra.is_empty() {
        info!(sample = %sample_names(&extra, SAMPLE_SIZE), "removed columns");
    }
    if !missing.is_empty() {
        info!(sample = %sample_names(&missing, SAMPLE_SIZE), "added columns");
    }

    let report = ReconcileReport { extra, missing };
    Ok((DataFrame::new(columns)?, report))
}
