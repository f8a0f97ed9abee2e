//! Reading reference dictionaries into plain text rows.
//!
//! Dictionaries are curated by hand in spreadsheets and sometimes exported
//! to CSV, so both formats are accepted. Only the first sheet of a workbook
//! is read, and its first row is the header.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::ReaderBuilder;
use hemoprod_model::normalize_label;

use crate::error::{Result, SchemaLoadError};

/// Header plus text rows of one reference file.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ReferenceTable {
    pub fn new(path: impl Into<PathBuf>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            path: path.into(),
            headers: headers.iter().map(|h| normalize_label(h)).collect(),
            rows,
        }
    }

    /// Parse file contents, choosing the format from the path's extension.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => parse_csv(path, &bytes),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => parse_workbook(path, bytes),
            _ => Err(SchemaLoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Index of the first header matching any candidate, ignoring case.
    pub fn column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(candidate))
        })
    }

    /// Like [`ReferenceTable::column`], failing with the preferred name.
    pub fn require_column(&self, column: &'static str, synonyms: &[&str]) -> Result<usize> {
        if let Some(idx) = self.column(&[column]) {
            return Ok(idx);
        }
        self.column(synonyms)
            .ok_or_else(|| SchemaLoadError::MissingColumn {
                path: self.path.clone(),
                column,
                found: self.headers.join(", "),
            })
    }

    /// Cell text of a row; short rows read as empty.
    pub fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Read a CSV or spreadsheet reference file.
pub fn read_reference_table(path: &Path) -> Result<ReferenceTable> {
    let bytes = std::fs::read(path).map_err(|source| SchemaLoadError::io(path, source))?;
    ReferenceTable::from_bytes(path, bytes)
}

fn parse_csv(path: &Path, bytes: &[u8]) -> Result<ReferenceTable> {
    let csv_error = |source| SchemaLoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(|value| value.trim().to_string()).collect());
    }
    Ok(ReferenceTable::new(path, headers, rows))
}

fn parse_workbook(path: &Path, bytes: Vec<u8>) -> Result<ReferenceTable> {
    let workbook_error = |source| SchemaLoadError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(workbook_error)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SchemaLoadError::NoSheets {
            path: path.to_path_buf(),
        })?;
    let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(cell_text).collect())
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    Ok(ReferenceTable::new(path, headers, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    }
}
