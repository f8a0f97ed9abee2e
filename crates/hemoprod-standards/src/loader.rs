//! Schema Dictionary Loader.

use std::path::{Path, PathBuf};

use hemoprod_model::{
    AliasEntry, AliasInsert, AliasMap, CanonicalFieldSpec, CanonicalSchema, DeclaredType,
};
use tracing::{info, warn};

use crate::error::{Result, SchemaLoadError};
use crate::hash::sha256_hex;
use crate::table::ReferenceTable;

const FIELD_NAME: &str = "field_name";
const DECLARED_TYPE: &str = "declared_type";
const SOURCE_LABEL: &str = "source_label";
const CANONICAL_FIELD: &str = "canonical_field";

/// Column names used by the historical dictionaries.
const FIELD_NAME_SYNONYMS: &[&str] = &["nome_sql"];
const DECLARED_TYPE_SYNONYMS: &[&str] = &["tipo_dados"];
const SOURCE_LABEL_SYNONYMS: &[&str] = &["nome_original"];
const CANONICAL_FIELD_SYNONYMS: &[&str] = &["nome_sql"];

/// Reference data loaded once at process start and shared read-only.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub schema: CanonicalSchema,
    pub aliases: AliasMap,
    pub schema_path: PathBuf,
    pub schema_sha256: String,
    pub aliases_path: PathBuf,
    pub aliases_sha256: String,
}

/// Load both dictionaries and cross-check alias targets against the schema.
pub fn load_reference_data(schema_path: &Path, aliases_path: &Path) -> Result<ReferenceData> {
    let (schema_table, schema_sha256) = read_fingerprinted(schema_path)?;
    let schema = canonical_schema_from_table(&schema_table)?;
    let (alias_table, aliases_sha256) = read_fingerprinted(aliases_path)?;
    let aliases = alias_map_from_table(&alias_table)?;

    let outside = aliases.targets_outside(&schema);
    if !outside.is_empty() {
        warn!(
            count = outside.len(),
            sample = %sample_names(&outside),
            "alias targets are not canonical fields; their columns will be dropped"
        );
    }
    info!(
        fields = schema.len(),
        integer_fields = schema.integer_fields().count(),
        aliases = aliases.len(),
        "reference data loaded"
    );
    Ok(ReferenceData {
        schema,
        aliases,
        schema_path: schema_path.to_path_buf(),
        schema_sha256,
        aliases_path: aliases_path.to_path_buf(),
        aliases_sha256,
    })
}

pub fn load_canonical_schema(path: &Path) -> Result<CanonicalSchema> {
    let (table, _) = read_fingerprinted(path)?;
    canonical_schema_from_table(&table)
}

pub fn load_alias_map(path: &Path) -> Result<AliasMap> {
    let (table, _) = read_fingerprinted(path)?;
    alias_map_from_table(&table)
}

/// Build the canonical schema from a dictionary table.
///
/// Blank names are skipped; a repeated name keeps its first declaration.
pub fn canonical_schema_from_table(table: &ReferenceTable) -> Result<CanonicalSchema> {
    let name_idx = table.require_column(FIELD_NAME, FIELD_NAME_SYNONYMS)?;
    let type_idx = table.require_column(DECLARED_TYPE, DECLARED_TYPE_SYNONYMS)?;

    let mut fields: Vec<CanonicalFieldSpec> = Vec::new();
    for row in table.rows() {
        let field = CanonicalFieldSpec::new(
            ReferenceTable::cell(row, name_idx),
            DeclaredType::parse_lenient(ReferenceTable::cell(row, type_idx)),
        );
        if field.name.is_empty() {
            continue;
        }
        if let Some(first) = fields.iter().find(|existing| existing.name == field.name) {
            warn!(
                field = %field.name,
                kept = %first.declared_type,
                ignored = %field.declared_type,
                "duplicate canonical field; keeping first declaration"
            );
            continue;
        }
        fields.push(field);
    }

    CanonicalSchema::new(fields).map_err(|source| SchemaLoadError::InvalidSchema {
        path: table.path().to_path_buf(),
        source,
    })
}

/// Build the alias map from a dictionary table.
///
/// Conflicting rows keep the first target. Canonical names also resolve to
/// themselves once the schema is applied, so they need no alias row.
pub fn alias_map_from_table(table: &ReferenceTable) -> Result<AliasMap> {
    let label_idx = table.require_column(SOURCE_LABEL, SOURCE_LABEL_SYNONYMS)?;
    let target_idx = table.require_column(CANONICAL_FIELD, CANONICAL_FIELD_SYNONYMS)?;

    let mut aliases = AliasMap::new();
    let mut conflicts = 0usize;
    for row in table.rows() {
        let entry = AliasEntry::new(
            ReferenceTable::cell(row, label_idx),
            ReferenceTable::cell(row, target_idx),
        );
        if entry.source_label.is_empty() || entry.canonical_field.is_empty() {
            continue;
        }
        if let AliasInsert::Conflict { existing } = aliases.insert(entry.clone()) {
            conflicts += 1;
            warn!(
                label = %entry.source_label,
                kept = %existing,
                ignored = %entry.canonical_field,
                "conflicting alias; keeping first target"
            );
        }
    }
    if conflicts > 0 {
        warn!(conflicts, path = %table.path().display(), "alias dictionary has conflicting rows");
    }
    Ok(aliases)
}

fn read_fingerprinted(path: &Path) -> Result<(ReferenceTable, String)> {
    let bytes = std::fs::read(path).map_err(|source| SchemaLoadError::io(path, source))?;
    let sha256 = sha256_hex(&bytes);
    info!(path = %path.display(), sha256 = %sha256, "reading reference file");
    let table = ReferenceTable::from_bytes(path, bytes)?;
    Ok((table, sha256))
}

fn sample_names(names: &[String]) -> String {
    const SAMPLE: usize = 5;
    let mut sample = names
        .iter()
        .take(SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > SAMPLE {
        sample.push_str(&format!(" (+{} more)", names.len() - SAMPLE));
    }
    sample
}
