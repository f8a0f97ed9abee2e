//! CLI argument definitions for the HEMOPROD consolidator.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "hemoprod",
    version,
    about = "HEMOPROD consolidator - normalize regional blood-service reports into one national table",
    long_about = "Normalize the regional HEMOPROD spreadsheets against the canonical \
                  field dictionary and consolidate them into a single Parquet table.\n\n\
                  Missing regions are skipped, unreadable ones are reported, and \
                  resubmitted reports keep only their latest submission."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags and RUST_LOG).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Append logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every source and write the national table.
    Run(RunArgs),

    /// Report unaliased labels and missing fields per source without writing.
    Audit(SourceArgs),

    /// List configured sources and whether their files and sheets exist.
    Sources(SourceArgs),
}

/// Where configuration, dictionaries and sources come from.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// TOML configuration file.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the regional spreadsheets.
    #[arg(long = "raw-dir", value_name = "DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Canonical schema dictionary (field name and declared type).
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Alias dictionary (source label and canonical field).
    #[arg(long = "aliases", value_name = "FILE")]
    pub aliases: Option<PathBuf>,

    /// Use every spreadsheet found in the raw directory as a source.
    #[arg(long = "discover")]
    pub discover: bool,

    /// Only process these source ids (comma separated).
    #[arg(long = "only", value_name = "ID", value_delimiter = ',')]
    pub only: Vec<String>,
}

#[derive(Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output Parquet file for the national table.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write the national table as CSV.
    #[arg(long = "csv", value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Also write one processed Parquet file per source into this directory.
    #[arg(long = "per-source-dir", value_name = "DIR")]
    pub per_source_dir: Option<PathBuf>,

    /// Write a JSON run report with per-source status and metrics.
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Process and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
