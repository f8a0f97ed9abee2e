use std::path::PathBuf;

use hemoprod_model::ModelError;

/// Failure to load reference data. Always fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("unsupported reference file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("workbook {path} has no sheets")]
    NoSheets { path: PathBuf },

    #[error("{path} is missing required column '{column}' (found: {found})")]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
        found: String,
    },

    #[error("invalid canonical schema in {path}: {source}")]
    InvalidSchema {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

impl SchemaLoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaLoadError>;
