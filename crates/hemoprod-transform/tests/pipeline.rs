//! Stage and consolidation behavior on small in-memory tables.

use hemoprod_model::{
    AliasEntry, AliasMap, CanonicalFieldSpec, CanonicalSchema, DeclaredType, FieldRoles,
};
use hemoprod_transform::{
    DedupOutcome, PipelineContext, SourceFrame, coerce_column, consolidate, deduplicate_latest,
    normalize_columns, normalize_source, split_locality_region, split_period_year,
};
use polars::prelude::{AnyValue, Column, DataFrame, DataType};

fn test_df(columns: Vec<(&str, Vec<Option<&str>>)>) -> DataFrame {
    DataFrame::new(
        columns
            .into_iter()
            .map(|(name, values)| Column::new(name.into(), values))
            .collect(),
    )
    .unwrap()
}

fn schema() -> CanonicalSchema {
    CanonicalSchema::new(vec![
        CanonicalFieldSpec::new("cnpj", DeclaredType::Text),
        CanonicalFieldSpec::new("ano_referencia", DeclaredType::Integer),
        CanonicalFieldSpec::new("periodo_referencia", DeclaredType::Text),
        CanonicalFieldSpec::new("razao_social_nome_fantasia", DeclaredType::Text),
        CanonicalFieldSpec::new("data_envio", DeclaredType::Timestamp),
        CanonicalFieldSpec::new("total_coletas", DeclaredType::Integer),
        CanonicalFieldSpec::new("taxa_descarte", DeclaredType::Decimal),
    ])
    .unwrap()
}

fn aliases() -> AliasMap {
    AliasMap::from_entries([
        AliasEntry::new(" Total Collected \u{a0}", "total_coletas"),
        AliasEntry::new("Total de Coletas", "total_coletas"),
        AliasEntry::new("CNPJ", "cnpj"),
        AliasEntry::new("Ano", "ano_referencia"),
        AliasEntry::new("Período", "periodo_referencia"),
        AliasEntry::new("Nome", "razao_social_nome_fantasia"),
        AliasEntry::new("Data de Envio", "data_envio"),
        AliasEntry::new("Taxa", "taxa_descarte"),
    ])
}

fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    hemoprod_common::column_strings(df.column(name).unwrap()).unwrap()
}

fn ints(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn period_year_split_examples() {
    let mut df = test_df(vec![
        (
            "periodo_referencia",
            vec![Some("October/2022"), Some("Consolidated 2023"), Some("Março")],
        ),
        ("ano_referencia", vec![None, None, Some("2021")]),
    ]);
    let report = split_period_year(&mut df, "periodo_referencia", "ano_referencia").unwrap();

    assert_eq!(report.rows_split, 2);
    assert_eq!(report.conflicts, 0);
    assert_eq!(
        strings(&df, "periodo_referencia"),
        [
            Some("October".to_string()),
            Some("Consolidated".to_string()),
            Some("Março".to_string())
        ]
    );
    assert_eq!(
        strings(&df, "ano_referencia"),
        [
            Some("2022".to_string()),
            Some("2023".to_string()),
            Some("2021".to_string())
        ]
    );
}

#[test]
fn locality_region_split_example() {
    let mut df = test_df(vec![("municipio", vec![Some("Maceió, Alagoas"), Some("Recife")])]);
    let report = split_locality_region(&mut df, "municipio", "uf").unwrap();

    assert_eq!(report.rows_split, 1);
    assert_eq!(
        strings(&df, "municipio"),
        [Some("Maceió".to_string()), Some("Recife".to_string())]
    );
    assert_eq!(strings(&df, "uf"), [Some("Alagoas".to_string()), None]);
}

#[test]
fn whitespace_alias_is_resolved() {
    let df = test_df(vec![(" Total Collected \u{a0}", vec![Some("3")])]);
    let (out, report) = normalize_columns(&df, &schema(), &aliases()).unwrap();
    assert_eq!(out.get_column_names()[0].as_str(), "total_coletas");
    assert_eq!(report.cleaned, 1);
    assert_eq!(report.renamed.len(), 1);
}

#[test]
fn normalize_source_records_metrics() {
    let df = test_df(vec![
        ("CNPJ", vec![Some("1"), Some("1"), Some("2")]),
        ("Ano", vec![None, None, Some("2022")]),
        ("Período", vec![Some("Jan/2022"), Some("Jan/2022"), Some("Fev")]),
        ("Nome", vec![Some("Hemo A"), Some("Hemo A"), Some("Hemo B")]),
        (
            "Data de Envio",
            vec![
                Some("2022-02-01 08:00:00"),
                Some("2022-02-10 08:00:00"),
                Some("15/02/2022"),
            ],
        ),
        ("Total de Coletas", vec![Some("1.234"), None, Some("10")]),
        ("Coluna Antiga", vec![Some("x"), Some("y"), Some("z")]),
    ]);
    let schema = schema();
    let aliases = aliases();
    let roles = FieldRoles::default();
    let ctx = PipelineContext::new(&schema, &aliases, &roles);

    let normalized = normalize_source(&df, &ctx).unwrap();
    let metrics = &normalized.metrics;
    assert_eq!(metrics.original_columns, 7);
    assert_eq!(metrics.original_rows, 3);
    assert_eq!(metrics.period_year_splits, 2);
    assert_eq!(metrics.columns_added, 1);
    assert_eq!(metrics.columns_removed, 1);
    assert_eq!(metrics.duplicates_removed, 1);
    assert_eq!(metrics.coercion_fallbacks, 0);
    assert_eq!(metrics.final_columns, 7);
    assert_eq!(metrics.final_rows, 2);
    assert!(!metrics.dedup_skipped);

    let data = &normalized.data;
    assert_eq!(ints(data, "ano_referencia"), [Some(2022), Some(2022)]);
    // The later Jan/2022 submission had no count; the fill pass made it zero.
    assert_eq!(ints(data, "total_coletas"), [Some(0), Some(10)]);
    assert_eq!(
        data.column("data_envio").unwrap().dtype(),
        &DataType::Datetime(polars::prelude::TimeUnit::Milliseconds, None)
    );
}

#[test]
fn integer_text_with_thousands_separator() {
    let df = test_df(vec![
        ("cnpj", vec![Some("1")]),
        ("total_coletas", vec![Some("1.234")]),
    ]);
    let schema = schema();
    let aliases = AliasMap::new();
    let roles = FieldRoles::default();
    let ctx = PipelineContext::new(&schema, &aliases, &roles);

    let normalized = normalize_source(&df, &ctx).unwrap();
    assert_eq!(ints(&normalized.data, "total_coletas"), [Some(1234)]);
}

#[test]
fn unsupported_coercion_names_column_and_types() {
    let column = Column::new("ativo".into(), vec![true, false]);
    let err = coerce_column(&column, DeclaredType::Timestamp).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"cannot coerce column 'ativo' of type bool to timestamp");
}

#[test]
fn dedup_is_skipped_when_key_column_is_missing() {
    let df = test_df(vec![
        ("cnpj", vec![Some("1"), Some("1")]),
        ("data_envio", vec![Some("2022-01-01"), Some("2022-01-02")]),
    ]);
    let roles = FieldRoles::default();
    let (out, outcome) = deduplicate_latest(&df, &roles.dedup_key(), &roles.submitted_at).unwrap();

    assert_eq!(out.height(), 2);
    match outcome {
        DedupOutcome::Skipped(skipped) => assert_eq!(
            skipped.missing,
            ["ano_referencia", "periodo_referencia", "razao_social_nome_fantasia"]
        ),
        other => panic!("expected a skipped dedup, got {other:?}"),
    }
}

#[test]
fn three_regions_consolidate_with_cross_source_dedup() {
    let schema = schema();
    let aliases = aliases();
    let roles = FieldRoles::default();
    let ctx = PipelineContext::new(&schema, &aliases, &roles);

    let x = test_df(vec![
        ("CNPJ", vec![Some("11")]),
        ("Ano", vec![Some("2022")]),
        ("Período", vec![Some("Janeiro")]),
        ("Nome", vec![Some("Hemocentro X")]),
        ("Data de Envio", vec![Some("2022-02-01 09:00:00")]),
        (" Total Collected \u{a0}", vec![Some("5")]),
        ("Taxa", vec![Some("0.5")]),
    ]);
    let y = test_df(vec![
        ("cnpj", vec![Some("11"), Some("22")]),
        ("ano_referencia", vec![Some("2022"), Some("2022")]),
        ("periodo_referencia", vec![Some("Janeiro"), Some("Janeiro")]),
        (
            "razao_social_nome_fantasia",
            vec![Some("Hemocentro X"), Some("Hemocentro Y")],
        ),
        (
            "data_envio",
            vec![Some("2022-03-01 09:00:00"), Some("2022-02-15 09:00:00")],
        ),
        ("Total de Coletas", vec![Some("7"), Some("9")]),
        ("taxa_descarte", vec![Some("0.25"), Some("0.1")]),
    ]);
    let z = test_df(vec![
        ("CNPJ", vec![Some("33")]),
        ("Ano", vec![Some("2022")]),
        ("Período", vec![Some("Fevereiro")]),
        ("Nome", vec![Some("Hemocentro Z")]),
        ("Data de Envio", vec![Some("01/03/2022")]),
        ("total_coletas", vec![Some("4")]),
    ]);

    let mut frames = Vec::new();
    for (id, df) in [("x", x), ("y", y), ("z", z)] {
        let normalized = normalize_source(&df, &ctx).unwrap();
        frames.push(SourceFrame::new(id, normalized.data));
    }
    let consolidated = consolidate(frames, &schema, &roles, "source_id").unwrap();
    let data = &consolidated.data;

    assert_eq!(data.height(), 3);
    assert_eq!(consolidated.report.duplicates_removed, 1);
    assert_eq!(consolidated.report.total_columns, schema.len() + 1);
    let names: Vec<&str> = data.get_column_names().iter().map(|n| n.as_str()).collect();
    let mut expected: Vec<&str> = schema.names().collect();
    expected.push("source_id");
    assert_eq!(names, expected);

    // The key shared by X and Y keeps Y's later submission.
    let cnpj = strings(data, "cnpj");
    let kept = cnpj.iter().position(|v| v.as_deref() == Some("11")).unwrap();
    assert_eq!(ints(data, "total_coletas")[kept], Some(7));
    assert_eq!(strings(data, "source_id")[kept].as_deref(), Some("y"));
    assert!(!strings(data, "source_id").iter().any(|v| v.as_deref() == Some("x")));

    // Z never had the rate column; it was synthesized as zero.
    let z_row = cnpj.iter().position(|v| v.as_deref() == Some("33")).unwrap();
    assert_eq!(
        data.column("taxa_descarte").unwrap().get(z_row).unwrap(),
        AnyValue::Float64(0.0)
    );
    assert_eq!(data.column("taxa_descarte").unwrap().dtype(), &DataType::Float64);
    assert_eq!(data.column("total_coletas").unwrap().dtype(), &DataType::Int64);

    assert_eq!(consolidated.report.rows_per_source.get("x"), None);
    assert_eq!(consolidated.report.rows_per_source.get("y"), Some(&2));
    assert_eq!(consolidated.report.rows_per_source.get("z"), Some(&1));
}
