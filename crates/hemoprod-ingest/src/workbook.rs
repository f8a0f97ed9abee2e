//! Workbook (XLSX/XLS/ODS) reading.
//!
//! Each column takes the single cell kind all of its non-empty cells share.
//! Integral floats count as integers because spreadsheet tools store whole
//! numbers as floats. Columns mixing kinds become text.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use hemoprod_common::format_numeric;
use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::header::unique_headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Unknown,
    Bool,
    Int,
    Float,
    DateTime,
    Text,
}

/// List the sheets of a workbook in file order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path).map_err(|source| IngestError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(workbook.sheet_names())
}

/// Read one sheet (or the first one) into a `DataFrame`.
///
/// Returns the frame and the name of the sheet that was read.
pub fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<(DataFrame, String)> {
    let workbook_error = |source| IngestError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let names = workbook.sheet_names();
    let sheet = match sheet {
        Some(wanted) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| IngestError::SheetMissing {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
                available: names.join(", "),
            })?,
        None => names.first().cloned().ok_or_else(|| IngestError::NoSheets {
            path: path.to_path_buf(),
        })?,
    };

    let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;
    let df = range_to_dataframe(&range)?;
    debug!(
        path = %path.display(),
        sheet = %sheet,
        rows = df.height(),
        columns = df.width(),
        "read workbook sheet"
    );
    Ok((df, sheet))
}

fn range_to_dataframe(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let width = range.width();
    let names = unique_headers(
        (0..width)
            .map(|idx| header.get(idx).map(header_text).unwrap_or_default())
            .collect(),
    );
    let body: Vec<&[Data]> = rows.collect();

    let mut columns = Vec::with_capacity(width);
    for (idx, name) in names.iter().enumerate() {
        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(idx)).collect();
        columns.push(build_column(name, &cells)?);
    }
    Ok(DataFrame::new(columns)?)
}

fn build_column(name: &str, cells: &[Option<&Data>]) -> Result<Column> {
    let kind = cells
        .iter()
        .flatten()
        .fold(CellKind::Unknown, |kind, cell| merge_kind(kind, cell));

    let series = match kind {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells.iter().map(|cell| cell.and_then(cell_i64)).collect();
            Series::new(name.into(), values)
        }
        CellKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|cell| cell.and_then(cell_f64)).collect();
            Series::new(name.into(), values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Some(Data::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellKind::DateTime => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Some(Data::DateTime(dt)) => {
                        dt.as_datetime().map(|dt| dt.and_utc().timestamp_millis())
                    }
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        CellKind::Text | CellKind::Unknown => {
            let values: Vec<Option<String>> =
                cells.iter().map(|cell| cell.and_then(cell_text)).collect();
            Series::new(name.into(), values)
        }
    };
    Ok(series.into_column())
}

fn merge_kind(current: CellKind, cell: &Data) -> CellKind {
    let next = match cell {
        Data::Empty | Data::Error(_) => return current,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                return current;
            }
            CellKind::Text
        }
        Data::Bool(_) => CellKind::Bool,
        Data::Int(_) => CellKind::Int,
        Data::Float(f) if is_integral(*f) => CellKind::Int,
        Data::Float(_) => CellKind::Float,
        Data::DateTime(dt) if dt.as_datetime().is_some() => CellKind::DateTime,
        Data::DateTime(_) => CellKind::Text,
    };
    match (current, next) {
        (CellKind::Unknown, next) => next,
        (current, next) if current == next => current,
        (CellKind::Int, CellKind::Float) | (CellKind::Float, CellKind::Int) => CellKind::Float,
        _ => CellKind::Text,
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15
}

fn cell_i64(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if is_integral(*f) => Some(*f as i64),
        _ => None,
    }
}

fn cell_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

/// Text rendering of a cell in a mixed or textual column.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_numeric(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Float(f) => format_numeric(*f),
        other => cell_text(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(cells: &[Data]) -> CellKind {
        cells
            .iter()
            .fold(CellKind::Unknown, |kind, cell| merge_kind(kind, cell))
    }

    #[test]
    fn integral_floats_are_integers() {
        assert_eq!(kind_of(&[Data::Float(2022.0), Data::Int(2023)]), CellKind::Int);
        assert_eq!(kind_of(&[Data::Int(1), Data::Float(1.5)]), CellKind::Float);
    }

    #[test]
    fn blanks_do_not_change_kind() {
        let cells = [
            Data::Empty,
            Data::Int(3),
            Data::String("  ".to_string()),
            Data::Int(4),
        ];
        assert_eq!(kind_of(&cells), CellKind::Int);
        assert_eq!(kind_of(&[]), CellKind::Unknown);
    }

    #[test]
    fn mixed_kinds_become_text() {
        assert_eq!(
            kind_of(&[Data::Int(1), Data::String("1.234".to_string())]),
            CellKind::Text
        );
        assert_eq!(kind_of(&[Data::Bool(true), Data::Int(1)]), CellKind::Text);
    }

    #[test]
    fn range_to_dataframe_types_columns() {
        let mut range = Range::new((0, 0), (3, 2));
        range.set_value((0, 0), Data::String("cnpj".to_string()));
        range.set_value((0, 1), Data::String("total".to_string()));
        range.set_value((0, 2), Data::Empty);
        range.set_value((1, 0), Data::String("001".to_string()));
        range.set_value((1, 1), Data::Float(12.0));
        range.set_value((2, 0), Data::Int(2));
        range.set_value((2, 1), Data::Int(3));
        range.set_value((3, 1), Data::String("n/d".to_string()));
        range.set_value((3, 2), Data::Bool(true));

        let df = range_to_dataframe(&range).unwrap();
        assert_eq!(df.height(), 3);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["cnpj", "total", "Unnamed: 2"]);
        assert_eq!(df.column("cnpj").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("total").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Unnamed: 2").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(
            df.column("total").unwrap().get(0).unwrap(),
            AnyValue::String("12")
        );
        assert_eq!(df.column("cnpj").unwrap().get(2).unwrap(), AnyValue::Null);
    }

    #[test]
    fn numeric_column_stays_numeric() {
        let mut range = Range::new((0, 0), (2, 0));
        range.set_value((0, 0), Data::String("total".to_string()));
        range.set_value((1, 0), Data::Float(5.0));
        range.set_value((2, 0), Data::Int(7));
        let df = range_to_dataframe(&range).unwrap();
        let column = df.column("total").unwrap();
        assert_eq!(column.dtype(), &DataType::Int64);
        assert_eq!(column.get(0).unwrap(), AnyValue::Int64(5));
    }
}
