//! Run configuration: TOML file, defaults and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hemoprod_model::{FieldRoles, SourceSpec};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub schema: PathBuf,
    pub aliases: PathBuf,
    pub output: PathBuf,
    /// Optional comma-separated copy of the national table.
    pub csv: Option<PathBuf>,
    pub per_source_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("dados_brutos"),
            schema: PathBuf::from("dicionario_colunas_269_COM_TIPOS.xlsx"),
            aliases: PathBuf::from("dicionario_colunas_269_all.xlsx"),
            output: PathBuf::from("base_nacional.parquet"),
            csv: None,
            per_source_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Column naming the source of each consolidated row.
    pub provenance_column: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            provenance_column: "source_id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub fields: FieldRoles,
    pub output: OutputConfig,
    /// Explicit source list; empty means the built-in regional catalogue.
    pub sources: Vec<SourceSpec>,
}

/// Command-line values that replace `[paths]` entries.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub raw_dir: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub aliases: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub per_source_dir: Option<PathBuf>,
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl Config {
    /// Parse a configuration file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        if let Some(base) = path.parent()
            && !base.as_os_str().is_empty()
        {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    /// Load `path` when given, otherwise start from the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Anchor every relative `[paths]` entry at `base`.
    pub fn resolve_relative(&mut self, base: &Path) {
        let paths = &mut self.paths;
        paths.raw_dir = resolve_against(base, &paths.raw_dir);
        paths.schema = resolve_against(base, &paths.schema);
        paths.aliases = resolve_against(base, &paths.aliases);
        paths.output = resolve_against(base, &paths.output);
        paths.csv = paths.csv.as_deref().map(|path| resolve_against(base, path));
        paths.per_source_dir = paths
            .per_source_dir
            .as_deref()
            .map(|dir| resolve_against(base, dir));
    }

    pub fn apply_overrides(&mut self, overrides: PathOverrides) {
        let PathOverrides {
            raw_dir,
            schema,
            aliases,
            output,
            csv,
            per_source_dir,
        } = overrides;
        if let Some(raw_dir) = raw_dir {
            self.paths.raw_dir = raw_dir;
        }
        if let Some(schema) = schema {
            self.paths.schema = schema;
        }
        if let Some(aliases) = aliases {
            self.paths.aliases = aliases;
        }
        if let Some(output) = output {
            self.paths.output = output;
        }
        if csv.is_some() {
            self.paths.csv = csv;
        }
        if per_source_dir.is_some() {
            self.paths.per_source_dir = per_source_dir;
        }
    }
}
