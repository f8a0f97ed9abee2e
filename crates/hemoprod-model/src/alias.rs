//! Label normalization and the historical alias map.
//!
//! Spreadsheet exports embed non-breaking spaces, byte-order marks and
//! line breaks in header cells. The same [`normalize_label`] pass is applied
//! to alias keys when the map is built and to every lookup, so a label matches
//! its alias regardless of those invisible artifacts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schema::CanonicalSchema;

/// Clean a raw column label.
///
/// Trims surrounding whitespace, turns non-breaking spaces into regular
/// spaces, drops zero-width characters and collapses runs of internal
/// whitespace (including line breaks) into a single space.
///
/// ```
/// use hemoprod_model::normalize_label;
///
/// assert_eq!(normalize_label(" Total Collected \u{a0}"), "Total Collected");
/// assert_eq!(normalize_label("Total\u{a0}\u{a0}de\nColetas"), "Total de Coletas");
/// ```
pub fn normalize_label(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '\u{feff}' | '\u{200b}' | '\u{200c}' | '\u{200d}'))
        .map(|ch| match ch {
            '\u{a0}' | '\u{2007}' | '\u{202f}' => ' ',
            other => other,
        })
        .collect();
    let mut parts = replaced.split_whitespace();
    let mut normalized = String::with_capacity(replaced.len());
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

/// One observed source label and the canonical field it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub source_label: String,
    pub canonical_field: String,
}

impl AliasEntry {
    pub fn new(source_label: impl AsRef<str>, canonical_field: impl AsRef<str>) -> Self {
        Self {
            source_label: normalize_label(source_label.as_ref()),
            canonical_field: normalize_label(canonical_field.as_ref()),
        }
    }
}

/// Outcome of adding an entry to an [`AliasMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasInsert {
    Inserted,
    /// Same label and same target already present.
    Duplicate,
    /// Label already maps elsewhere; the existing target is kept.
    Conflict { existing: String },
}

/// Many-to-one lookup from normalized source labels to canonical names.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: HashMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map, keeping the first target for conflicting labels.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = AliasEntry>,
    {
        let mut map = Self::new();
        for entry in entries {
            map.insert(entry);
        }
        map
    }

    pub fn insert(&mut self, entry: AliasEntry) -> AliasInsert {
        let key = normalize_label(&entry.source_label);
        let target = normalize_label(&entry.canonical_field);
        match self.entries.get(&key) {
            Some(existing) if *existing == target => AliasInsert::Duplicate,
            Some(existing) => AliasInsert::Conflict {
                existing: existing.clone(),
            },
            None => {
                self.entries.insert(key, target);
                AliasInsert::Inserted
            }
        }
    }

    /// Look up a label, normalizing it first.
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.entries
            .get(&normalize_label(label))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(label, target)| (label.as_str(), target.as_str()))
    }

    /// Distinct alias targets that are not fields of `schema`, sorted.
    pub fn targets_outside(&self, schema: &CanonicalSchema) -> Vec<String> {
        let mut outside: Vec<String> = self
            .entries
            .values()
            .filter(|target| !schema.contains(target))
            .cloned()
            .collect();
        outside.sort();
        outside.dedup();
        outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_bom_and_zero_width() {
        assert_eq!(normalize_label("\u{feff}cnpj"), "cnpj");
        assert_eq!(normalize_label("data\u{200b}_envio"), "data_envio");
        assert_eq!(normalize_label("   "), "");
    }

    #[test]
    fn map_keeps_first_target_on_conflict() {
        let mut map = AliasMap::new();
        assert_eq!(
            map.insert(AliasEntry::new("Ano", "ano_referencia")),
            AliasInsert::Inserted
        );
        assert_eq!(
            map.insert(AliasEntry::new("Ano ", "ano_referencia")),
            AliasInsert::Duplicate
        );
        assert_eq!(
            map.insert(AliasEntry::new("Ano", "ano_envio")),
            AliasInsert::Conflict {
                existing: "ano_referencia".to_string()
            }
        );
        assert_eq!(map.resolve("Ano"), Some("ano_referencia"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn lookups_normalize_the_query() {
        let map = AliasMap::from_entries([AliasEntry::new(
            "Total\u{a0}de coletas",
            "total_coletas",
        )]);
        assert_eq!(map.resolve("  Total de  coletas\n"), Some("total_coletas"));
        assert_eq!(map.resolve("Total coletas"), None);
    }
}
