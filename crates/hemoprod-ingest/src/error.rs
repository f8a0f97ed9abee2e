//! Error types for regional source ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or reading a source.
#[derive(Debug, Error)]
pub enum IngestError {
    // === Missing Sources ===
    /// Configured file does not exist.
    #[error("source file not found: {path}")]
    SourceMissing { path: PathBuf },

    /// Workbook exists but lacks the configured sheet.
    #[error("sheet '{sheet}' not found in {path} (available: {available})")]
    SheetMissing {
        path: PathBuf,
        sheet: String,
        available: String,
    },

    // === Read Errors ===
    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workbook is corrupt, locked or in an unknown format.
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// Delimited file could not be parsed.
    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unsupported encoding {encoding} in {path}")]
    UnsupportedEncoding {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("unsupported source format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Workbook without any sheet to read.
    #[error("workbook has no sheets: {path}")]
    NoSheets { path: PathBuf },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl IngestError {
    /// True for the "legitimately absent" cases that skip a source quietly.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            IngestError::SourceMissing { .. } | IngestError::SheetMissing { .. }
        )
    }
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = IngestError::SheetMissing {
            path: PathBuf::from("Hemoprod_AL.xlsx"),
            sheet: "HEMOPROD - ALAGOAS".to_string(),
            available: "Planilha1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sheet 'HEMOPROD - ALAGOAS' not found in Hemoprod_AL.xlsx (available: Planilha1)"
        );
    }

    #[test]
    fn missing_classification() {
        let missing = IngestError::SourceMissing {
            path: PathBuf::from("x.xlsx"),
        };
        let unsupported = IngestError::UnsupportedFormat {
            path: PathBuf::from("x.txt"),
        };
        assert!(missing.is_missing());
        assert!(!unsupported.is_missing());
    }

    #[test]
    fn error_from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("test".into());
        let ingest_err: IngestError = polars_err.into();
        assert!(matches!(ingest_err, IngestError::DataFrame { .. }));
    }
}
