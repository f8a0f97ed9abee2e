//! Delimited (CSV) source reading.

use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::header::unique_headers;

/// Read a CSV file with every column as text.
///
/// Empty cells become nulls so the coercion engine treats them as missing.
pub fn read_delimited(path: &Path) -> Result<DataFrame> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(IngestError::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding: "UTF-16",
        });
    }
    let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);
    let headers = unique_headers(
        reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect(),
    );

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for (idx, column) in values.iter_mut().enumerate() {
            let cell = record
                .get(idx)
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string);
            column.push(cell);
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(values)
        .map(|(name, cells)| Series::new(name.as_str().into(), cells).into_column())
        .collect();
    let df = DataFrame::new(columns)?;
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read delimited source"
    );
    Ok(df)
}
