//! Logical roles played by specific canonical fields.

use serde::{Deserialize, Serialize};

/// Canonical field names the pipeline treats specially.
///
/// The four identity fields form the dedup key; `submitted_at` orders
/// resubmissions; the period/year and locality/region pairs are the
/// composite fields split before type coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRoles {
    /// Tax/registration id of the reporting entity.
    pub entity_id: String,
    pub reference_year: String,
    pub reference_period: String,
    pub entity_name: String,
    /// Submission timestamp used to pick the latest resubmission.
    pub submitted_at: String,
    pub locality: String,
    pub region: String,
}

impl Default for FieldRoles {
    fn default() -> Self {
        Self {
            entity_id: "cnpj".to_string(),
            reference_year: "ano_referencia".to_string(),
            reference_period: "periodo_referencia".to_string(),
            entity_name: "razao_social_nome_fantasia".to_string(),
            submitted_at: "data_envio".to_string(),
            locality: "municipio".to_string(),
            region: "uf".to_string(),
        }
    }
}

impl FieldRoles {
    /// Fields identifying "the same logical report", in key order.
    pub fn dedup_key(&self) -> [&str; 4] {
        [
            self.entity_id.as_str(),
            self.reference_year.as_str(),
            self.reference_period.as_str(),
            self.entity_name.as_str(),
        ]
    }

    /// Dedup key fields followed by the submission timestamp.
    pub fn dedup_columns(&self) -> [&str; 5] {
        let [a, b, c, d] = self.dedup_key();
        [a, b, c, d, self.submitted_at.as_str()]
    }
}
