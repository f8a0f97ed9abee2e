//! Column Normalizer.
//!
//! Runs in two phases: raw labels are cleaned first (the same
//! [`normalize_label`] pass used on alias keys), then the alias map renames
//! cleaned labels to canonical names. Labels without an alias keep their
//! cleaned form and are dropped later by the reconciler.

use std::collections::HashSet;

use hemoprod_model::{AliasMap, CanonicalSchema, normalize_label};
use polars::prelude::{Column, DataFrame};
use tracing::{debug, warn};

use crate::error::Result;

/// What the normalizer changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Labels altered by cleanup alone.
    pub cleaned: usize,
    /// `(cleaned label, canonical name)` pairs renamed through the alias map.
    pub renamed: Vec<(String, String)>,
    /// Raw labels dropped because an earlier column already took their name.
    pub collisions: Vec<String>,
}

/// Target name for a cleaned label.
///
/// A label that already is a canonical field keeps its name, so running
/// the normalizer on its own output changes nothing.
pub fn resolve_label<'a>(
    cleaned: &'a str,
    schema: &'a CanonicalSchema,
    aliases: &'a AliasMap,
) -> &'a str {
    if schema.contains(cleaned) {
        return cleaned;
    }
    aliases.resolve(cleaned).unwrap_or(cleaned)
}

/// Clean and alias every column label.
///
/// When two columns land on the same name the first one in source order
/// wins and the later ones are dropped.
pub fn normalize_columns(
    df: &DataFrame,
    schema: &CanonicalSchema,
    aliases: &AliasMap,
) -> Result<(DataFrame, NormalizationReport)> {
    let mut report = NormalizationReport::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(df.width());
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let raw = column.name().as_str();
        let cleaned = normalize_label(raw);
        if cleaned != raw {
            report.cleaned += 1;
        }
        let target = resolve_label(&cleaned, schema, aliases).to_string();
        if target != cleaned {
            report.renamed.push((cleaned.clone(), target.clone()));
        }
        if !seen.insert(target.clone()) {
            warn!(
                column = %raw,
                target = %target,
                "column maps to a name already taken; dropping it"
            );
            report.collisions.push(raw.to_string());
            continue;
        }
        columns.push(column.clone().with_name(target.as_str().into()));
    }

    debug!(
        cleaned = report.cleaned,
        renamed = report.renamed.len(),
        collisions = report.collisions.len(),
        "columns normalized"
    );
    Ok((DataFrame::new(columns)?, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemoprod_model::{AliasEntry, CanonicalFieldSpec, DeclaredType};
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    fn schema() -> CanonicalSchema {
        CanonicalSchema::new(vec![
            CanonicalFieldSpec::new("cnpj", DeclaredType::Text),
            CanonicalFieldSpec::new("total_coletas", DeclaredType::Integer),
        ])
        .unwrap()
    }

    fn frame(names: &[&str]) -> DataFrame {
        let columns = names
            .iter()
            .map(|name| Series::new((*name).into(), vec![1i64]).into_column())
            .collect();
        DataFrame::new(columns).unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn cleans_before_aliasing() {
        let aliases = AliasMap::from_entries([AliasEntry::new("Total Collected", "total_coletas")]);
        let (df, report) =
            normalize_columns(&frame(&[" Total Collected \u{a0}", "CNPJ "]), &schema(), &aliases)
                .unwrap();
        assert_eq!(names(&df), ["total_coletas", "CNPJ"]);
        assert_eq!(report.cleaned, 2);
        assert_eq!(
            report.renamed,
            [("Total Collected".to_string(), "total_coletas".to_string())]
        );
    }

    #[test]
    fn canonical_names_are_never_realiased() {
        let aliases = AliasMap::from_entries([AliasEntry::new("cnpj", "total_coletas")]);
        let (df, report) = normalize_columns(&frame(&["cnpj"]), &schema(), &aliases).unwrap();
        assert_eq!(names(&df), ["cnpj"]);
        assert!(report.renamed.is_empty());
    }

    #[test]
    fn first_colliding_column_wins() {
        let aliases = AliasMap::from_entries([
            AliasEntry::new("Coletas", "total_coletas"),
            AliasEntry::new("Coletas (antigo)", "total_coletas"),
        ]);
        let (df, report) = normalize_columns(
            &frame(&["Coletas", "cnpj", "Coletas (antigo)"]),
            &schema(),
            &aliases,
        )
        .unwrap();
        assert_eq!(names(&df), ["total_coletas", "cnpj"]);
        assert_eq!(report.collisions, ["Coletas (antigo)"]);
    }
}
