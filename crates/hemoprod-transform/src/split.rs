//! Composite Field Splitter.
//!
//! Two cells sometimes carry a second attribute: a period such as
//! `October/2022` embeds the reference year and a locality such as
//! `Maceió, Alagoas` embeds the region. Each splitter reads the whole pair
//! of columns, resolves every row with a pure function and writes both
//! columns back only when some row changed. The embedded value always wins
//! over a different value already stored in the target column.

use std::sync::LazyLock;

use hemoprod_common::{column_strings, parse_f64};
use polars::prelude::{DataFrame, NamedFrom, Series};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{4})\b").expect("valid year regex"));

/// Rows altered by one splitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub rows_split: usize,
    /// Rows whose existing target value was overwritten.
    pub conflicts: usize,
}

/// Both columns of a pair after splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitColumns {
    pub primary: Vec<Option<String>>,
    pub secondary: Vec<Option<String>>,
    pub report: SplitReport,
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == '/' || ch == '-'
}

/// Find a standalone 4-digit year in a period cell.
///
/// Returns the period text without the year and its adjacent separators
/// (`None` when nothing else remains) and the year.
///
/// ```
/// use hemoprod_transform::extract_year;
///
/// assert_eq!(extract_year("October/2022"), Some((Some("October".to_string()), 2022)));
/// assert_eq!(extract_year("2023"), Some((None, 2023)));
/// assert_eq!(extract_year("1º trimestre"), None);
/// ```
pub fn extract_year(text: &str) -> Option<(Option<String>, i32)> {
    let token = YEAR_TOKEN.captures(text)?.get(1)?;
    let year: i32 = token.as_str().parse().ok()?;
    let left = text[..token.start()].trim_end_matches(is_separator);
    let right = text[token.end()..].trim_start_matches(is_separator);
    let remainder = format!("{left} {right}")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(((!remainder.is_empty()).then_some(remainder), year))
}

/// Split a locality cell on its first comma into `(locality, region)`.
///
/// Only the first comma is considered, so a locality containing a comma of
/// its own is split there as well.
///
/// ```
/// use hemoprod_transform::split_locality;
///
/// assert_eq!(
///     split_locality("Maceió, Alagoas"),
///     Some(("Maceió".to_string(), "Alagoas".to_string()))
/// );
/// assert_eq!(split_locality("Maceió"), None);
/// ```
pub fn split_locality(text: &str) -> Option<(String, String)> {
    let (locality, region) = text.split_once(',')?;
    Some((locality.trim().to_string(), region.trim().to_string()))
}

fn same_year(existing: &str, year: i32) -> bool {
    parse_f64(existing).is_some_and(|value| value == f64::from(year))
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|text| text.trim().is_empty())
}

/// Resolve period and year columns row by row.
pub fn resolve_period_year(
    periods: Vec<Option<String>>,
    years: Vec<Option<String>>,
) -> SplitColumns {
    let mut report = SplitReport::default();
    let mut primary = Vec::with_capacity(periods.len());
    let mut secondary = Vec::with_capacity(periods.len());

    for (period, year) in periods.into_iter().zip(years) {
        let Some((remainder, embedded)) = period.as_deref().and_then(extract_year) else {
            primary.push(period);
            secondary.push(year);
            continue;
        };
        let year_changed = !year.as_deref().is_some_and(|y| same_year(y, embedded));
        if year_changed && !is_blank(year.as_deref()) {
            report.conflicts += 1;
        }
        let new_period = remainder.or(period.clone());
        if year_changed || new_period != period {
            report.rows_split += 1;
        }
        primary.push(new_period);
        secondary.push(if year_changed {
            Some(embedded.to_string())
        } else {
            year
        });
    }

    SplitColumns {
        primary,
        secondary,
        report,
    }
}

/// Resolve locality and region columns row by row.
pub fn resolve_locality_region(
    localities: Vec<Option<String>>,
    regions: Vec<Option<String>>,
) -> SplitColumns {
    let mut report = SplitReport::default();
    let mut primary = Vec::with_capacity(localities.len());
    let mut secondary = Vec::with_capacity(localities.len());

    for (locality, region) in localities.into_iter().zip(regions) {
        let Some((city, parsed)) = locality.as_deref().and_then(split_locality) else {
            primary.push(locality);
            secondary.push(region);
            continue;
        };
        let new_locality = (!city.is_empty()).then_some(city);
        let mut new_region = region.clone();
        if !parsed.is_empty() {
            let existing = region.as_deref().map(str::trim);
            if existing != Some(parsed.as_str()) {
                if !is_blank(existing) {
                    report.conflicts += 1;
                }
                new_region = Some(parsed);
            }
        }
        if new_locality != locality || new_region != region {
            report.rows_split += 1;
        }
        primary.push(new_locality);
        secondary.push(new_region);
    }

    SplitColumns {
        primary,
        secondary,
        report,
    }
}

fn split_pair(
    df: &mut DataFrame,
    primary: &str,
    secondary: &str,
    resolve: fn(Vec<Option<String>>, Vec<Option<String>>) -> SplitColumns,
) -> Result<SplitReport> {
    let Ok(primary_column) = df.column(primary) else {
        debug!(column = primary, "column absent; nothing to split");
        return Ok(SplitReport::default());
    };
    let primary_values = column_strings(primary_column)?;
    let secondary_values = match df.column(secondary) {
        Ok(column) => column_strings(column)?,
        Err(_) => vec![None; df.height()],
    };

    let split = resolve(primary_values, secondary_values);
    if split.report.rows_split > 0 {
        df.with_column(Series::new(primary.into(), split.primary))?;
        df.with_column(Series::new(secondary.into(), split.secondary))?;
    }
    Ok(split.report)
}

/// Move years embedded in the period column into the year column.
pub fn split_period_year(df: &mut DataFrame, period: &str, year: &str) -> Result<SplitReport> {
    let report = split_pair(df, period, year, resolve_period_year)?;
    if report.conflicts > 0 {
        warn!(
            conflicts = report.conflicts,
            column = year,
            "embedded year differs from stored year; embedded value kept"
        );
    }
    debug!(rows = report.rows_split, "period/year split");
    Ok(report)
}

/// Move regions embedded in the locality column into the region column.
pub fn split_locality_region(
    df: &mut DataFrame,
    locality: &str,
    region: &str,
) -> Result<SplitReport> {
    let report = split_pair(df, locality, region, resolve_locality_region)?;
    if report.conflicts > 0 {
        warn!(
            conflicts = report.conflicts,
            column = region,
            "embedded region differs from stored region; embedded value kept"
        );
    }
    debug!(rows = report.rows_split, "locality/region split");
    Ok(report)
}
