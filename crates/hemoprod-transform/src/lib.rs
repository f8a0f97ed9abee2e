//! Schema normalization and consolidation of HEMOPROD tables.
//!
//! Each source table goes through the stages in [`pipeline`]; the tables
//! that survive are folded together by [`consolidate`].

pub mod coerce;
pub mod consolidate;
pub mod dedupe;
pub mod error;
pub mod fill;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod split;

pub use coerce::{
    CoercionReport, ColumnCoercionWarning, TIMESTAMP_DTYPE, coerce_column, coerce_columns,
    parse_decimal_text, parse_integer_text, parse_timestamp_text,
};
pub use consolidate::{Consolidated, SourceFrame, consolidate};
pub use dedupe::{DedupOutcome, DeduplicationSkipped, deduplicate_latest};
pub use error::{Result, TransformError};
pub use fill::{FillReport, fill_integer_nulls};
pub use normalize::{NormalizationReport, normalize_columns, resolve_label};
pub use pipeline::{NormalizedSource, PipelineContext, Stage, StageError, normalize_source};
pub use reconcile::{
    ReconcileReport, default_column, reconcile_schema, sample_names, storage_dtype,
};
pub use split::{
    SplitReport, extract_year, resolve_locality_region, resolve_period_year,
    split_locality, split_period_year, split_locality_region,
};
