//! Null-Fill Pass.
//!
//! An absent count in a submitted report means zero occurrences. Runs after
//! coercion so the zero is a typed integer, and after reconciliation so only
//! blank cells of columns the source actually had are touched.

use hemoprod_model::CanonicalSchema;
use polars::prelude::{Column, DataFrame, DataType};
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub columns: usize,
    pub cells: usize,
}

fn fill_column(column: &Column) -> Result<Column> {
    let name = column.name().clone();
    let series = column.as_materialized_series();
    let filled = match column.dtype() {
        DataType::Int64 => {
            let values: Vec<i64> = series.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect();
            Column::new(name, values)
        }
        // Text fallback of a column whose integer coercion failed.
        DataType::String => {
            let values: Vec<&str> = series.str()?.into_iter().map(|v| v.unwrap_or("0")).collect();
            Column::new(name, values)
        }
        _ => {
            let values: Vec<i64> = series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| v.unwrap_or(0))
                .collect();
            Column::new(name, values)
        }
    };
    Ok(filled)
}

/// Replace nulls with zero in every integer-declared column.
pub fn fill_integer_nulls(df: &mut DataFrame, schema: &CanonicalSchema) -> Result<FillReport> {
    let mut report = FillReport::default();
    for name in schema.integer_fields() {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let nulls = column.null_count();
        if nulls == 0 {
            continue;
        }
        let filled = fill_column(column)?;
        df.with_column(filled)?;
        report.columns += 1;
        report.cells += nulls;
    }
    debug!(
        columns = report.columns,
        cells = report.cells,
        "integer nulls filled with zero"
    );
    Ok(report)
}
