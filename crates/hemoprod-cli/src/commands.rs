use anyhow::Result;
use hemoprod_cli::config::{Config, PathOverrides};
use hemoprod_cli::pipeline;
use hemoprod_cli::types::{RunResult, RunSettings, SourceAudit, SourcePresence};

use crate::cli::{RunArgs, SourceArgs};

fn settings_from(args: &SourceArgs, extra: PathOverrides) -> Result<RunSettings> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    config.apply_overrides(PathOverrides {
        raw_dir: args.raw_dir.clone(),
        schema: args.schema.clone(),
        aliases: args.aliases.clone(),
        ..extra
    });
    Ok(RunSettings {
        config,
        discover: args.discover,
        only: args.only.clone(),
        ..RunSettings::default()
    })
}

pub fn run(args: &RunArgs) -> Result<RunResult> {
    let mut settings = settings_from(
        &args.sources,
        PathOverrides {
            output: args.output.clone(),
            csv: args.csv.clone(),
            per_source_dir: args.per_source_dir.clone(),
            ..PathOverrides::default()
        },
    )?;
    settings.dry_run = args.dry_run;
    settings.report_path = args.report.clone();
    pipeline::run_national(&settings)
}

pub fn audit(args: &SourceArgs) -> Result<Vec<SourceAudit>> {
    let settings = settings_from(args, PathOverrides::default())?;
    pipeline::run_audit(&settings)
}

pub fn sources(args: &SourceArgs) -> Result<Vec<SourcePresence>> {
    let settings = settings_from(args, PathOverrides::default())?;
    pipeline::run_sources(&settings)
}
