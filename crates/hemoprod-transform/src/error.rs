//! Error types for the normalization pipeline.

use hemoprod_model::DeclaredType;
use thiserror::Error;

/// Errors raised while transforming tables.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A column's storage type has no conversion to the declared type.
    #[error("cannot coerce column '{column}' of type {dtype} to {target}")]
    UnsupportedCoercion {
        column: String,
        dtype: String,
        target: DeclaredType,
    },

    /// The provenance column would shadow a canonical field.
    #[error("provenance column '{column}' is also a canonical field")]
    ProvenanceCollision { column: String },

    /// No source produced a usable table.
    #[error("no source produced a usable table; nothing to consolidate")]
    NoUsableSources,

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for TransformError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
