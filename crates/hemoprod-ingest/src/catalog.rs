//! Built-in catalogue of regional sources and directory discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use hemoprod_model::SourceSpec;
use tracing::warn;

use crate::error::{IngestError, Result};

/// `(id, region name, sheet name)` of every regional HEMOPROD export.
const REGIONS: &[(&str, &str, &str)] = &[
    ("al", "Alagoas", "HEMOPROD - ALAGOAS"),
    ("am", "Amazonas", "HEMOPROD - AMAZONAS"),
    ("ap", "Amapá", "HEMOPROD - AMAPA"),
    ("ba", "Bahia", "HEMOPROD - BAHIA"),
    ("ce", "Ceará", "Planilha1"),
    ("df", "Distrito Federal", "HEMOPROD - DISTRITOFEDERAL"),
    ("es", "Espírito Santo", "HEMOPROD - ESPIRITOSANTO"),
    ("go", "Goiás", "HEMOPROD - GOIAS"),
    ("hm", "Hemominas", "HEMOPROD - HEMOMINAS"),
    ("ma", "Maranhão", "HEMOPROD - MARANHAO"),
    ("mg", "Minas Gerais", "HEMOPROD - MINASGERAIS"),
    ("ms", "Mato Grosso do Sul", "HEMOPROD - MATOGROSSODOSUL"),
    ("mt", "Mato Grosso", "HEMOPROD - MATOGROSSO"),
    ("pa", "Pará", "HEMOPROD - PARA"),
    ("pb", "Paraíba", "HEMOPROD - PARAIBA"),
    ("pe", "Pernambuco", "HEMOPROD - PERNAMBUCO"),
    ("pi", "Piauí", "HEMOPROD - PIAUI"),
    ("pr", "Paraná", "HEMOPROD - PARANA"),
    ("rj", "Rio de Janeiro", "Hemoprod_RJ"),
    ("rn", "Rio Grande do Norte", "HEMOPROD - RIOGRANDEDONORTE"),
    ("ro", "Rondônia", "HEMOPROD - RONDONIA"),
    ("rr", "Roraima", "HEMOPROD - RORAIMA"),
    ("rs", "Rio Grande do Sul", "HEMOPROD - RIOGRANDEDOSUL"),
    ("sc", "Santa Catarina", "HEMOPROD - SANTACATARINA"),
    ("se", "Sergipe", "HEMOPROD - SERGIPE"),
    ("sp", "São Paulo", "Hemoprod_SP"),
    ("to", "Tocantins", "HEMOPROD - TOCANTINS"),
];

const FILE_PREFIX: &str = "Hemoprod_";
const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

fn region_name(id: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(region, _, _)| *region == id)
        .map(|(_, name, _)| *name)
}

/// The 27 regional sources with their file and sheet names.
pub fn builtin_sources() -> Vec<SourceSpec> {
    REGIONS
        .iter()
        .map(|(id, name, sheet)| {
            let file = if *id == "hm" {
                format!("{FILE_PREFIX}Hemominas.xlsx")
            } else {
                format!("{FILE_PREFIX}{}.xlsx", id.to_uppercase())
            };
            SourceSpec::new(*id, file).with_name(*name).with_sheet(*sheet)
        })
        .collect()
}

/// Derive a source id from a file name: `Hemoprod_CE.xlsx` reads as `ce`.
pub fn source_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?.trim();
    let bare = if stem.len() > FILE_PREFIX.len()
        && stem.is_char_boundary(FILE_PREFIX.len())
        && stem[..FILE_PREFIX.len()].eq_ignore_ascii_case(FILE_PREFIX)
    {
        &stem[FILE_PREFIX.len()..]
    } else {
        stem
    };
    let id = bare.to_lowercase();
    if id.is_empty() {
        return None;
    }
    Some(if id == "hemominas" { "hm".to_string() } else { id })
}

/// Every readable spreadsheet in `dir`, sorted by file name, first sheet.
///
/// Office lock files (`~$...`) are ignored. When two files derive the same
/// id the first in name order is kept.
pub fn discover_sources(dir: &Path) -> Result<Vec<SourceSpec>> {
    let read_error = |source| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if !path.is_file() {
            continue;
        }
        let lock_file = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| ext.eq_ignore_ascii_case(supported))
            });
        if supported && !lock_file {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for path in files {
        let Some(id) = source_id_from_path(&path) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            warn!(path = %path.display(), source_id = %id, "duplicate source id; file ignored");
            continue;
        }
        let file = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.clone());
        let mut spec = SourceSpec::new(id.as_str(), file);
        if let Some(name) = region_name(&id) {
            spec = spec.with_name(name);
        }
        sources.push(spec);
    }
    Ok(sources)
}
