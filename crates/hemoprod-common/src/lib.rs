//! Shared utilities for the HEMOPROD consolidation crates.
//!
//! This crate provides the Polars helpers every stage needs when it has to
//! look at individual cells: stringification, numeric parsing and dtype
//! classification.

pub mod polars;

pub use polars::{
    any_to_f64, any_to_string, column_strings, format_numeric, is_numeric_dtype, parse_f64,
};
