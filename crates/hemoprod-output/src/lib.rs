//! Persistence of the national table and its audit trail.

mod error;
mod files;
mod report;

pub use error::{OutputError, Result};
pub use files::{
    ensure_parent_dir, per_source_file_name, write_csv, write_parquet, write_per_source,
};
pub use report::write_run_report;
