//! The canonical target schema.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alias::normalize_label;
use crate::error::{ModelError, Result};
use crate::types::DeclaredType;

/// One target field and its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFieldSpec {
    pub name: String,
    pub declared_type: DeclaredType,
}

impl CanonicalFieldSpec {
    pub fn new(name: impl AsRef<str>, declared_type: DeclaredType) -> Self {
        Self {
            name: normalize_label(name.as_ref()),
            declared_type,
        }
    }
}

/// Ordered, immutable list of canonical fields with unique names.
///
/// Field order is the column order of every normalized table.
#[derive(Debug, Clone)]
pub struct CanonicalSchema {
    fields: Vec<CanonicalFieldSpec>,
    positions: HashMap<String, usize>,
}

impl CanonicalSchema {
    pub fn new(fields: Vec<CanonicalFieldSpec>) -> Result<Self> {
        if fields.is_empty() {
            return Err(ModelError::EmptySchema);
        }
        let mut positions = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(ModelError::BlankField { position });
            }
            if positions.insert(field.name.clone(), position).is_some() {
                return Err(ModelError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Self { fields, positions })
    }

    pub fn fields(&self) -> &[CanonicalFieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn declared_type(&self, name: &str) -> Option<DeclaredType> {
        self.position(name)
            .map(|position| self.fields[position].declared_type)
    }

    /// Names of fields declared as integer counts, in canonical order.
    pub fn integer_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.declared_type.is_count())
            .map(|field| field.name.as_str())
    }
}
