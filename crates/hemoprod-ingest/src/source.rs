//! Locating and reading one configured regional source.

use std::path::{Path, PathBuf};

use hemoprod_model::SourceSpec;
use polars::prelude::DataFrame;

use crate::delimited::read_delimited;
use crate::error::{IngestError, Result};
use crate::workbook::{read_workbook, sheet_names};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Workbook,
    Delimited,
}

impl SourceFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Workbook),
            "csv" => Some(Self::Delimited),
            _ => None,
        }
    }
}

/// A source whose file (and sheet, for workbooks) was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub sheet: Option<String>,
}

/// Raw table read from one source, before normalization.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub source_id: String,
    pub path: PathBuf,
    /// Sheet actually read; `None` for delimited files.
    pub sheet: Option<String>,
    pub data: DataFrame,
}

fn resolve_path(spec: &SourceSpec, raw_dir: &Path) -> PathBuf {
    if spec.file.is_absolute() {
        spec.file.clone()
    } else {
        raw_dir.join(&spec.file)
    }
}

fn existing_path(spec: &SourceSpec, raw_dir: &Path) -> Result<(PathBuf, SourceFormat)> {
    let path = resolve_path(spec, raw_dir);
    if !path.is_file() {
        return Err(IngestError::SourceMissing { path });
    }
    let format = SourceFormat::from_path(&path)
        .ok_or_else(|| IngestError::UnsupportedFormat { path: path.clone() })?;
    Ok((path, format))
}

/// Check that a source's file and configured sheet exist without reading data.
pub fn locate_source(spec: &SourceSpec, raw_dir: &Path) -> Result<SourceLocation> {
    let (path, format) = existing_path(spec, raw_dir)?;
    if format == SourceFormat::Delimited {
        return Ok(SourceLocation { path, sheet: None });
    }
    let names = sheet_names(&path)?;
    let sheet = match &spec.sheet {
        Some(wanted) if names.iter().any(|name| name == wanted) => wanted.clone(),
        Some(wanted) => {
            return Err(IngestError::SheetMissing {
                path,
                sheet: wanted.clone(),
                available: names.join(", "),
            });
        }
        None => names
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::NoSheets { path: path.clone() })?,
    };
    Ok(SourceLocation {
        path,
        sheet: Some(sheet),
    })
}

/// Locate and read a source.
pub fn read_source(spec: &SourceSpec, raw_dir: &Path) -> Result<SourceTable> {
    let (path, format) = existing_path(spec, raw_dir)?;
    let (data, sheet) = match format {
        SourceFormat::Workbook => {
            let (data, sheet) = read_workbook(&path, spec.sheet.as_deref())?;
            (data, Some(sheet))
        }
        SourceFormat::Delimited => (read_delimited(&path)?, None),
    };
    Ok(SourceTable {
        source_id: spec.id.clone(),
        path,
        sheet,
        data,
    })
}
