//! Tests for hemoprod-model types.

use proptest::prelude::*;

use hemoprod_model::{
    AliasEntry, AliasMap, CanonicalFieldSpec, CanonicalSchema, DeclaredType, FieldRoles,
    RunReport, SourceMetrics, SourceReport, SourceSpec, SourceStatus, normalize_label,
};

fn report(id: &str, status: SourceStatus) -> SourceReport {
    SourceReport {
        source_id: id.to_string(),
        name: id.to_uppercase(),
        path: format!("Hemoprod_{}.xlsx", id.to_uppercase()).into(),
        status,
        metrics: None,
        write_error: None,
    }
}

#[test]
fn run_report_counts_statuses() {
    let run = RunReport {
        sources: vec![
            report("al", SourceStatus::Processed),
            report(
                "am",
                SourceStatus::Skipped {
                    reason: "file not found".to_string(),
                },
            ),
            report(
                "ap",
                SourceStatus::Failed {
                    stage: "read".to_string(),
                    error: "corrupt".to_string(),
                },
            ),
            report("ba", SourceStatus::Processed),
        ],
        consolidation: None,
    };
    assert_eq!(run.processed_count(), 2);
    assert_eq!(run.skipped_count(), 1);
    assert_eq!(run.failed_count(), 1);
}

#[test]
fn source_report_serializes_with_flat_status() {
    let mut processed = report("ce", SourceStatus::Processed);
    processed.metrics = Some(SourceMetrics {
        original_rows: 10,
        final_rows: 8,
        duplicates_removed: 2,
        ..SourceMetrics::default()
    });
    let json = serde_json::to_value(&processed).expect("serialize report");
    assert_eq!(json["status"], "processed");
    assert_eq!(json["metrics"]["duplicates_removed"], 2);

    let round: SourceReport = serde_json::from_value(json).expect("deserialize report");
    assert_eq!(round, processed);
}

#[test]
fn default_roles_cover_dedup_key_and_timestamp() {
    let roles = FieldRoles::default();
    assert_eq!(
        roles.dedup_columns(),
        [
            "cnpj",
            "ano_referencia",
            "periodo_referencia",
            "razao_social_nome_fantasia",
            "data_envio"
        ]
    );
}

#[test]
fn source_spec_display_includes_sheet() {
    let spec = SourceSpec::new("al", "Hemoprod_AL.xlsx")
        .with_name("Alagoas")
        .with_sheet("HEMOPROD - ALAGOAS");
    assert_eq!(spec.to_string(), "Hemoprod_AL.xlsx [HEMOPROD - ALAGOAS]");
    assert_eq!(spec.display_name(), "Alagoas");
}

#[test]
fn canonical_names_are_normalized_like_aliases() {
    let schema = CanonicalSchema::new(vec![CanonicalFieldSpec::new(
        " data_envio\u{a0}",
        DeclaredType::Timestamp,
    )])
    .expect("schema");
    assert!(schema.contains("data_envio"));
}

proptest! {
    #[test]
    fn normalize_label_is_idempotent(raw in "[ a-zA-Z\u{a0}\t\n_]{0,24}") {
        let once = normalize_label(&raw);
        prop_assert_eq!(normalize_label(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }

    #[test]
    fn aliases_match_any_padding(label in "[a-zA-Z]{1,8}( [a-zA-Z]{1,8}){0,2}", pad in "[ \u{a0}]{0,3}") {
        let map = AliasMap::from_entries([AliasEntry::new(&label, "target")]);
        let padded = format!("{pad}{label}{pad}");
        prop_assert_eq!(map.resolve(&padded), Some("target"));
    }
}
