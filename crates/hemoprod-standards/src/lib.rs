//! Reference data for HEMOPROD consolidation.
//!
//! Loads the canonical schema dictionary (field name and declared type per
//! field) and the historical alias dictionary (observed label to canonical
//! name) from CSV or spreadsheet files.

pub mod error;
pub mod hash;
pub mod loader;
pub mod table;

pub use error::{Result, SchemaLoadError};
pub use hash::sha256_hex;
pub use loader::{
    ReferenceData, alias_map_from_table, canonical_schema_from_table, load_alias_map,
    load_canonical_schema, load_reference_data,
};
pub use table::{ReferenceTable, read_reference_table};
