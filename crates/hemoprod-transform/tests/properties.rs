//! Universally quantified behavior of the normalization stages.

use std::collections::{HashMap, HashSet};

use hemoprod_model::{AliasEntry, AliasMap, CanonicalFieldSpec, CanonicalSchema, DeclaredType};
use hemoprod_transform::{
    DedupOutcome, deduplicate_latest, fill_integer_nulls, normalize_columns, reconcile_schema,
};
use polars::prelude::{Column, DataFrame, DataType, TimeUnit};
use proptest::prelude::*;

const FIELDS: [(&str, DeclaredType); 5] = [
    ("cnpj", DeclaredType::Text),
    ("total_coletas", DeclaredType::Integer),
    ("taxa_descarte", DeclaredType::Decimal),
    ("data_envio", DeclaredType::Timestamp),
    ("obs", DeclaredType::Text),
];

fn schema() -> CanonicalSchema {
    CanonicalSchema::new(
        FIELDS
            .iter()
            .map(|(name, declared)| CanonicalFieldSpec::new(name, *declared))
            .collect(),
    )
    .unwrap()
}

fn canonical_names() -> Vec<&'static str> {
    FIELDS.iter().map(|(name, _)| *name).collect()
}

fn label_set() -> impl Strategy<Value = Vec<String>> {
    let known = prop::sample::select(vec![
        "cnpj",
        "total_coletas",
        "taxa_descarte",
        "data_envio",
        "obs",
        "Total de Coletas",
        "CNPJ",
        "extra",
        "Outra Coluna",
    ]);
    prop::collection::vec(known.prop_map(str::to_string), 0..8).prop_map(|labels| {
        let mut seen = HashSet::new();
        labels
            .into_iter()
            .filter(|label| seen.insert(label.clone()))
            .collect()
    })
}

fn text_df(labels: &[String], height: usize) -> DataFrame {
    DataFrame::new(
        labels
            .iter()
            .map(|label| Column::new(label.as_str().into(), vec![Some("1"); height]))
            .collect(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn normalizing_twice_changes_nothing(labels in label_set()) {
        let schema = schema();
        let aliases = AliasMap::from_entries([
            AliasEntry::new("Total de Coletas", "total_coletas"),
            AliasEntry::new("CNPJ", "cnpj"),
            // A canonical name used as another field's alias is never followed.
            AliasEntry::new("obs", "cnpj"),
        ]);
        let df = text_df(&labels, 2);
        let (once, _) = normalize_columns(&df, &schema, &aliases).unwrap();
        let (twice, report) = normalize_columns(&once, &schema, &aliases).unwrap();

        prop_assert_eq!(once.get_column_names(), twice.get_column_names());
        prop_assert!(report.renamed.is_empty());
        prop_assert!(report.collisions.is_empty());
    }

    #[test]
    fn reconciled_columns_equal_schema_in_order(labels in label_set(), height in 0usize..4) {
        let schema = schema();
        let df = text_df(&labels, height);
        let (out, _) = reconcile_schema(&df, &schema).unwrap();

        let names: Vec<&str> = out.get_column_names().iter().map(|n| n.as_str()).collect();
        prop_assert_eq!(names, canonical_names());
        prop_assert_eq!(out.height(), df.height());
    }

    #[test]
    fn integer_columns_have_no_nulls_after_fill(
        values in prop::collection::vec(prop::option::of(-1000i64..1000), 0..20),
    ) {
        let schema = schema();
        let mut df = DataFrame::new(vec![
            Column::new("total_coletas".into(), values.clone()),
        ])
        .unwrap();
        let report = fill_integer_nulls(&mut df, &schema).unwrap();

        let column = df.column("total_coletas").unwrap();
        prop_assert_eq!(column.null_count(), 0);
        prop_assert_eq!(report.cells, values.iter().filter(|v| v.is_none()).count());
    }

    #[test]
    fn dedup_keeps_one_latest_row_per_key(
        rows in prop::collection::vec((0u8..3, 0u8..2, 0i64..50), 1..25),
    ) {
        let ids: Vec<String> = rows.iter().map(|(id, _, _)| format!("e{id}")).collect();
        let periods: Vec<String> = rows.iter().map(|(_, p, _)| format!("p{p}")).collect();
        let stamps: Vec<i64> = rows.iter().map(|(_, _, t)| t * 60_000).collect();
        let marker: Vec<i64> = (0..rows.len() as i64).collect();
        let df = DataFrame::new(vec![
            Column::new("cnpj".into(), ids.clone()),
            Column::new("ano_referencia".into(), vec![2022i64; rows.len()]),
            Column::new("periodo_referencia".into(), periods.clone()),
            Column::new("razao_social_nome_fantasia".into(), vec!["Hemo"; rows.len()]),
            Column::new("data_envio".into(), stamps.clone())
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .unwrap(),
            Column::new("marker".into(), marker),
        ])
        .unwrap();
        let key = ["cnpj", "ano_referencia", "periodo_referencia", "razao_social_nome_fantasia"];
        let (out, outcome) = deduplicate_latest(&df, &key, "data_envio").unwrap();

        // Expected survivor per key: greatest timestamp, later row on ties.
        let mut expected: HashMap<(String, String), (i64, i64)> = HashMap::new();
        for (idx, (id, period)) in ids.iter().zip(&periods).enumerate() {
            let candidate = (stamps[idx], idx as i64);
            let entry = expected.entry((id.clone(), period.clone())).or_insert(candidate);
            if candidate >= *entry {
                *entry = candidate;
            }
        }

        prop_assert_eq!(out.height(), expected.len());
        prop_assert_eq!(outcome, DedupOutcome::Deduplicated { removed: rows.len() - expected.len() });

        let out_ids = hemoprod_common::column_strings(out.column("cnpj").unwrap()).unwrap();
        let out_periods =
            hemoprod_common::column_strings(out.column("periodo_referencia").unwrap()).unwrap();
        let out_markers: Vec<Option<i64>> = out
            .column("marker")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        let mut seen = HashSet::new();
        for row in 0..out.height() {
            let key = (
                out_ids[row].clone().unwrap(),
                out_periods[row].clone().unwrap(),
            );
            prop_assert!(seen.insert(key.clone()));
            prop_assert_eq!(out_markers[row], Some(expected[&key].1));
        }
    }
}
