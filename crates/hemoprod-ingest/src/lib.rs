//! Regional source ingestion.
//!
//! Locates each configured regional spreadsheet, checks that the expected
//! sheet exists and reads it into a Polars `DataFrame` whose columns keep
//! the cell kinds the workbook stored.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use hemoprod_ingest::{builtin_sources, read_source};
//!
//! for spec in builtin_sources() {
//!     let table = read_source(&spec, Path::new("dados_brutos"))?;
//!     println!("{}: {} rows", table.source_id, table.data.height());
//! }
//! ```

mod catalog;
mod delimited;
mod error;
mod header;
mod source;
mod workbook;

// === Error Types ===
pub use error::{IngestError, Result};

// === Source Catalogue ===
pub use catalog::{builtin_sources, discover_sources, source_id_from_path};

// === Reading ===
pub use delimited::read_delimited;
pub use header::unique_headers;
pub use source::{SourceLocation, SourceTable, locate_source, read_source};
pub use workbook::{read_workbook, sheet_names};
