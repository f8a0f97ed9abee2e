//! Declared data types of canonical fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target type of a canonical field.
///
/// Reference dictionaries spell types in many ways (`int64`, `float`,
/// `datetime64[ns]`, `object`, ...). [`DeclaredType::parse_lenient`] folds all
/// of them into four kinds and treats anything unrecognized as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Integer,
    Decimal,
    Timestamp,
    Text,
}

impl DeclaredType {
    /// Parse a dictionary type string, defaulting to [`DeclaredType::Text`].
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(DeclaredType::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Integer => "integer",
            DeclaredType::Decimal => "decimal",
            DeclaredType::Timestamp => "timestamp",
            DeclaredType::Text => "text",
        }
    }

    /// Absent values of integer fields are zero occurrences, not unknowns.
    pub fn is_count(&self) -> bool {
        matches!(self, DeclaredType::Integer)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclaredType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "int" | "integer" | "int64" | "int32" | "bigint" | "smallint" => {
                Ok(DeclaredType::Integer)
            }
            "float" | "float64" | "double" | "decimal" | "numeric" | "real" => {
                Ok(DeclaredType::Decimal)
            }
            "date" | "datetime" | "timestamp" | "datetime64[ns]" => Ok(DeclaredType::Timestamp),
            "string" | "text" | "object" | "str" => Ok(DeclaredType::Text),
            _ => Err(format!("Unknown declared type: {s}")),
        }
    }
}
