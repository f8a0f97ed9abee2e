//! Type Coercion Engine.
//!
//! Converts canonical columns to their declared types. Unparseable cells
//! become nulls. A column whose storage type cannot be converted at all
//! falls back to text with a [`ColumnCoercionWarning`] instead of failing
//! the whole source.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use hemoprod_common::{any_to_f64, column_strings, is_numeric_dtype, parse_f64};
use hemoprod_model::{CanonicalSchema, DeclaredType};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, TransformError};

/// Storage type of timestamp columns.
pub const TIMESTAMP_DTYPE: DataType = DataType::Datetime(TimeUnit::Milliseconds, None);

/// Days between the spreadsheet serial-date epoch (1899-12-30) and 1970-01-01.
const SERIAL_EPOCH_OFFSET_DAYS: f64 = 25_569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
];

/// A column stored as text because its coercion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCoercionWarning {
    pub column: String,
    pub target: DeclaredType,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    pub coerced: usize,
    pub fallbacks: Vec<ColumnCoercionWarning>,
}

impl CoercionReport {
    pub fn fell_back(&self, column: &str) -> bool {
        self.fallbacks.iter().any(|warning| warning.column == column)
    }
}

/// Parse an integer count, treating `,` and `.` as digit grouping.
///
/// ```
/// use hemoprod_transform::parse_integer_text;
///
/// assert_eq!(parse_integer_text("1.234"), Some(1234));
/// assert_eq!(parse_integer_text(" 1,234,567 "), Some(1_234_567));
/// assert_eq!(parse_integer_text("n/d"), None);
/// ```
pub fn parse_integer_text(value: &str) -> Option<i64> {
    let digits: String = value.chars().filter(|ch| *ch != ',' && *ch != '.').collect();
    parse_f64(&digits).and_then(round_to_i64)
}

/// Parse a decimal, returning `None` for blanks, garbage and NaN.
pub fn parse_decimal_text(value: &str) -> Option<f64> {
    parse_f64(value).filter(|v| !v.is_nan())
}

/// Best-effort timestamp parse; day-first dates are tried before month-first.
pub fn parse_timestamp_text(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn round_to_i64(value: f64) -> Option<i64> {
    let rounded = value.round_ties_even();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Spreadsheet serial day number to epoch milliseconds.
fn serial_to_millis(serial: f64) -> Option<i64> {
    if !serial.is_finite() || serial <= 0.0 || serial > 2_958_465.0 {
        return None;
    }
    Some(((serial - SERIAL_EPOCH_OFFSET_DAYS) * MS_PER_DAY).round() as i64)
}

fn unsupported(column: &Column, target: DeclaredType) -> TransformError {
    TransformError::UnsupportedCoercion {
        column: column.name().to_string(),
        dtype: column.dtype().to_string(),
        target,
    }
}

fn string_values(column: &Column) -> Result<Vec<Option<&str>>> {
    Ok(column.as_materialized_series().str()?.into_iter().collect())
}

fn float_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let floats = column.cast(&DataType::Float64)?;
    Ok(floats.as_materialized_series().f64()?.into_iter().collect())
}

fn to_integer(column: &Column) -> Result<Column> {
    let name = column.name().clone();
    let dtype = column.dtype();
    let values: Vec<Option<i64>> = match dtype {
        DataType::String => string_values(column)?
            .into_iter()
            .map(|value| value.and_then(parse_integer_text))
            .collect(),
        DataType::Null => vec![None; column.len()],
        DataType::Boolean => return Ok(column.cast(&DataType::Int64)?),
        dtype if dtype.is_integer() => return Ok(column.cast(&DataType::Int64)?),
        dtype if dtype.is_float() => float_values(column)?
            .into_iter()
            .map(|value| value.and_then(round_to_i64))
            .collect(),
        _ => return Err(unsupported(column, DeclaredType::Integer)),
    };
    Ok(Column::new(name, values))
}

fn to_decimal(column: &Column) -> Result<Column> {
    let name = column.name().clone();
    let values: Vec<Option<f64>> = match column.dtype() {
        DataType::String => string_values(column)?
            .into_iter()
            .map(|value| value.and_then(parse_decimal_text))
            .collect(),
        DataType::Null => vec![None; column.len()],
        dtype if is_numeric_dtype(dtype) || dtype == &DataType::Boolean => {
            return Ok(column.cast(&DataType::Float64)?);
        }
        _ => return Err(unsupported(column, DeclaredType::Decimal)),
    };
    Ok(Column::new(name, values))
}

fn to_timestamp(column: &Column) -> Result<Column> {
    let name = column.name().clone();
    let millis: Vec<Option<i64>> = match column.dtype() {
        DataType::Datetime(_, _) | DataType::Date => return Ok(column.cast(&TIMESTAMP_DTYPE)?),
        DataType::String => string_values(column)?
            .into_iter()
            .map(|value| {
                value
                    .and_then(parse_timestamp_text)
                    .map(|dt| dt.and_utc().timestamp_millis())
            })
            .collect(),
        DataType::Null => vec![None; column.len()],
        dtype if is_numeric_dtype(dtype) => (0..column.len())
            .map(|idx| {
                column
                    .get(idx)
                    .ok()
                    .and_then(any_to_f64)
                    .and_then(serial_to_millis)
            })
            .collect(),
        _ => return Err(unsupported(column, DeclaredType::Timestamp)),
    };
    Ok(Column::new(name, millis).cast(&TIMESTAMP_DTYPE)?)
}

fn to_text(column: &Column) -> Result<Column> {
    if column.dtype() == &DataType::String {
        return Ok(column.clone());
    }
    Ok(Column::new(column.name().clone(), column_strings(column)?))
}

/// Convert one column to a declared type.
///
/// Fails only when the storage type has no conversion (for example a
/// boolean column declared as timestamp); individual bad cells become null.
pub fn coerce_column(column: &Column, target: DeclaredType) -> Result<Column> {
    match target {
        DeclaredType::Integer => to_integer(column),
        DeclaredType::Decimal => to_decimal(column),
        DeclaredType::Timestamp => to_timestamp(column),
        DeclaredType::Text => to_text(column),
    }
}

/// Coerce every canonical column of `df` in place.
///
/// Columns outside the schema and those named in `skip` are left alone.
pub fn coerce_columns(
    df: &mut DataFrame,
    schema: &CanonicalSchema,
    skip: &[&str],
) -> Result<CoercionReport> {
    let mut report = CoercionReport::default();
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    for name in names {
        if skip.contains(&name.as_str()) {
            continue;
        }
        let Some(target) = schema.declared_type(&name) else {
            continue;
        };
        let column = df.column(&name)?;
        let coerced = match coerce_column(column, target) {
            Ok(coerced) => {
                report.coerced += 1;
                coerced
            }
            Err(err) => {
                warn!(
                    column = %name,
                    target = %target,
                    error = %err,
                    "column coercion failed; storing as text"
                );
                report.fallbacks.push(ColumnCoercionWarning {
                    column: name.clone(),
                    target,
                    reason: err.to_string(),
                });
                to_text(column)?
            }
        };
        df.with_column(coerced)?;
    }

    debug!(
        coerced = report.coerced,
        fallbacks = report.fallbacks.len(),
        "column types applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_column(values: &[Option<&str>]) -> Column {
        Column::new("v".into(), values.to_vec())
    }

    #[test]
    fn integer_rounds_half_to_even() {
        let column = Column::new("v".into(), vec![Some(2.5f64), Some(3.5), Some(-0.4), None]);
        let coerced = coerce_column(&column, DeclaredType::Integer).unwrap();
        let values: Vec<Option<i64>> = coerced
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(2), Some(4), Some(0), None]);
    }

    #[test]
    fn integer_text_strips_grouping() {
        let column = text_column(&[Some("1.234"), Some("12"), Some("abc"), Some(""), None]);
        let coerced = coerce_column(&column, DeclaredType::Integer).unwrap();
        assert_eq!(coerced.dtype(), &DataType::Int64);
        assert_eq!(coerced.get(0).unwrap(), AnyValue::Int64(1234));
        assert_eq!(coerced.get(2).unwrap(), AnyValue::Null);
        assert_eq!(coerced.get(3).unwrap(), AnyValue::Null);
    }

    #[test]
    fn decimal_parses_text() {
        let column = text_column(&[Some("2.5"), Some("nan"), Some("x")]);
        let coerced = coerce_column(&column, DeclaredType::Decimal).unwrap();
        assert_eq!(coerced.get(0).unwrap(), AnyValue::Float64(2.5));
        assert_eq!(coerced.get(1).unwrap(), AnyValue::Null);
        assert_eq!(coerced.get(2).unwrap(), AnyValue::Null);
    }

    #[test]
    fn timestamp_parses_day_first() {
        let parsed = parse_timestamp_text("05/03/2023 14:30").unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parsed, expected);
        assert!(parse_timestamp_text("2023-03-05T14:30:00Z").is_some());
        assert!(parse_timestamp_text("2023-03-05").is_some());
        assert!(parse_timestamp_text("não informado").is_none());
    }

    #[test]
    fn slash_dates_are_day_then_month() {
        let date = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        assert_eq!(parse_timestamp_text("05/03/2023"), Some(date(2023, 3, 5)));
        assert_eq!(parse_timestamp_text("03/05/2023"), Some(date(2023, 5, 3)));
        assert_eq!(parse_timestamp_text("13/05/2023"), Some(date(2023, 5, 13)));
        assert_eq!(parse_timestamp_text("05/13/2023"), None);

        let column = text_column(&[Some("05/03/2023"), Some("03/05/2023")]);
        let coerced = coerce_column(&column, DeclaredType::Timestamp).unwrap();
        let millis = coerced.cast(&DataType::Int64).unwrap();
        let (Ok(AnyValue::Int64(march)), Ok(AnyValue::Int64(may))) = (millis.get(0), millis.get(1))
        else {
            panic!("expected two timestamps");
        };
        assert!(march < may);
    }

    #[test]
    fn timestamp_from_serial_numbers() {
        let column = Column::new("v".into(), vec![Some(45_000.5f64), None]);
        let coerced = coerce_column(&column, DeclaredType::Timestamp).unwrap();
        assert_eq!(coerced.dtype(), &TIMESTAMP_DTYPE);
        let millis = coerced.cast(&DataType::Int64).unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(millis.get(0).unwrap(), AnyValue::Int64(expected));
    }

    #[test]
    fn unsupported_column_falls_back_to_text() {
        let mut df = DataFrame::new(vec![
            Column::new("data_envio".into(), vec![Some(true), Some(false)]),
            Column::new("total".into(), vec![Some("7"), None]),
            Column::new("extra".into(), vec![Some("x"), None]),
        ])
        .unwrap();
        let schema = CanonicalSchema::new(vec![
            hemoprod_model::CanonicalFieldSpec::new("data_envio", DeclaredType::Timestamp),
            hemoprod_model::CanonicalFieldSpec::new("total", DeclaredType::Integer),
        ])
        .unwrap();

        let report = coerce_columns(&mut df, &schema, &[]).unwrap();
        assert_eq!(report.coerced, 1);
        assert!(report.fell_back("data_envio"));
        assert_eq!(df.column("data_envio").unwrap().dtype(), &DataType::String);
        assert_eq!(
            df.column("data_envio").unwrap().get(0).unwrap(),
            AnyValue::String("true")
        );
        assert_eq!(df.column("total").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("extra").unwrap().dtype(), &DataType::String);
    }
}
