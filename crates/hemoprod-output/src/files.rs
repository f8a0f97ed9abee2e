//! Table writers.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::{CsvWriter, DataFrame, ParquetCompression, ParquetWriter, SerWriter};
use tracing::info;

use crate::error::{OutputError, Result};

/// Bytes per megabyte in size logs.
const MEGABYTE: f64 = 1024.0 * 1024.0;

/// Ensure a parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    ensure_parent_dir(path)?;
    File::create(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `df` as snappy-compressed Parquet and return the file size.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<u64> {
    let file = create(path)?;
    let mut data = df.clone();
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut data)
        .map_err(|err| OutputError::Encode {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let bytes = file_size(path)?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        size_mb = %format!("{:.2}", bytes as f64 / MEGABYTE),
        "parquet written"
    );
    Ok(bytes)
}

/// Write `df` as comma-separated text with a header row.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<u64> {
    let file = create(path)?;
    let mut data = df.clone();
    CsvWriter::new(file)
        .include_header(true)
        .finish(&mut data)
        .map_err(|err| OutputError::Encode {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let bytes = file_size(path)?;
    info!(path = %path.display(), rows = df.height(), "csv written");
    Ok(bytes)
}

/// File name of one source's processed table.
///
/// ```
/// use hemoprod_output::per_source_file_name;
///
/// assert_eq!(per_source_file_name("SP"), "hemoprod_sp.parquet");
/// ```
pub fn per_source_file_name(source_id: &str) -> String {
    format!("hemoprod_{}.parquet", source_id.to_lowercase())
}

/// Write one source's processed table into `dir`, returning its path.
pub fn write_per_source(df: &DataFrame, dir: &Path, source_id: &str) -> Result<PathBuf> {
    let path = dir.join(per_source_file_name(source_id));
    write_parquet(df, &path)?;
    Ok(path)
}
