use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hemoprod_cli::types::{PresenceState, RunResult, SourceAudit, SourcePresence};
use hemoprod_model::{SourceReport, SourceStatus};

/// Labels listed per source in the audit table.
const AUDIT_SAMPLE: usize = 8;

pub fn print_run_summary(result: &RunResult) {
    if result.dry_run {
        println!("Dry run: no files written");
    }
    if let Some(path) = &result.output {
        println!("Output: {}", path.display());
    }
    if let Some(path) = &result.csv_output {
        println!("CSV: {}", path.display());
    }
    for path in &result.per_source_outputs {
        println!("Per-source: {}", path.display());
    }
    if let Some(path) = &result.report_path {
        println!("Run report: {}", path.display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Status"),
        header_cell("Rows in"),
        header_cell("Cols in"),
        header_cell("Added"),
        header_cell("Removed"),
        header_cell("Fallbacks"),
        header_cell("Duplicates"),
        header_cell("Rows out"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..9 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for source in &result.report.sources {
        table.add_row(source_row(source));
    }
    if let Some(consolidation) = &result.report.consolidation {
        table.add_row(vec![
            Cell::new("TOTAL")
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new(format!("{} processed", result.report.processed_count()))
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold),
            dim_cell("-"),
            Cell::new(consolidation.total_columns).add_attribute(Attribute::Bold),
            dim_cell("-"),
            dim_cell("-"),
            count_cell(Some(consolidation.coercion_fallbacks), Color::Yellow),
            count_cell(Some(consolidation.duplicates_removed), Color::Yellow),
            Cell::new(consolidation.total_rows).add_attribute(Attribute::Bold),
        ]);
    }
    println!("{table}");

    let failures: Vec<&SourceReport> = result
        .report
        .sources
        .iter()
        .filter(|source| !matches!(source.status, SourceStatus::Processed))
        .collect();
    if !failures.is_empty() {
        eprintln!("Not consolidated:");
        for source in failures {
            match &source.status {
                SourceStatus::Skipped { reason } => eprintln!("- {}: {reason}", source.source_id),
                SourceStatus::Failed { stage, error } => {
                    eprintln!("- {} ({stage}): {error}", source.source_id);
                }
                SourceStatus::Processed => {}
            }
        }
    }

    for source in &result.report.sources {
        if let Some(error) = &source.write_error {
            eprintln!("Processed table not written for {}: {error}", source.source_id);
        }
    }
}

fn source_row(source: &SourceReport) -> Vec<Cell> {
    let mut row = vec![Cell::new(&source.source_id), status_cell(&source.status)];
    match &source.metrics {
        Some(metrics) => row.extend([
            Cell::new(metrics.original_rows),
            Cell::new(metrics.original_columns),
            count_cell(Some(metrics.columns_added), Color::Yellow),
            count_cell(Some(metrics.columns_removed), Color::Yellow),
            count_cell(Some(metrics.coercion_fallbacks), Color::Yellow),
            count_cell(Some(metrics.duplicates_removed), Color::Yellow),
            Cell::new(metrics.final_rows),
        ]),
        None => row.extend((0..7).map(|_| dim_cell("-"))),
    }
    row
}

pub fn print_audit(audits: &[SourceAudit]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Columns"),
        header_cell("Unaliased"),
        header_cell("Missing"),
        header_cell("Unaliased labels"),
    ]);
    apply_table_style(&mut table);
    for index in 1..4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for audit in audits {
        if let Some(problem) = &audit.problem {
            table.add_row(vec![
                Cell::new(&audit.source_id),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                Cell::new(problem).fg(Color::Red),
            ]);
            continue;
        }
        table.add_row(vec![
            Cell::new(&audit.source_id),
            Cell::new(audit.columns),
            count_cell(Some(audit.unaliased.len()), Color::Yellow),
            count_cell(Some(audit.missing.len()), Color::Yellow),
            Cell::new(hemoprod_transform::sample_names(&audit.unaliased, AUDIT_SAMPLE)),
        ]);
    }
    println!("{table}");
}

pub fn print_sources(sources: &[SourcePresence]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Name"),
        header_cell("File"),
        header_cell("Sheet"),
        header_cell("State"),
    ]);
    apply_table_style(&mut table);
    for source in sources {
        let state = match &source.state {
            PresenceState::Present => Cell::new(source.state.label()).fg(Color::Green),
            PresenceState::Missing(_) => Cell::new(source.state.label()).fg(Color::Yellow),
            PresenceState::Unreadable(reason) => {
                Cell::new(format!("{}: {reason}", source.state.label())).fg(Color::Red)
            }
        };
        table.add_row(vec![
            Cell::new(&source.source_id),
            Cell::new(&source.name),
            Cell::new(source.path.display()),
            match &source.sheet {
                Some(sheet) => Cell::new(sheet),
                None => dim_cell("(first)"),
            },
            state,
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: &SourceStatus) -> Cell {
    let color = match status {
        SourceStatus::Processed => Color::Green,
        SourceStatus::Skipped { .. } => Color::Yellow,
        SourceStatus::Failed { .. } => Color::Red,
    };
    Cell::new(status.label()).fg(color)
}

fn count_cell(count: Option<usize>, color: Color) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value).fg(color).add_attribute(Attribute::Bold),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
