pub mod alias;
pub mod error;
pub mod metrics;
pub mod roles;
pub mod schema;
pub mod source;
pub mod types;

pub use alias::{AliasEntry, AliasInsert, AliasMap, normalize_label};
pub use error::{ModelError, Result};
pub use metrics::{
    ConsolidationReport, RunReport, SourceMetrics, SourceReport, SourceStatus,
};
pub use roles::FieldRoles;
pub use schema::{CanonicalFieldSpec, CanonicalSchema};
pub use source::SourceSpec;
pub use types::DeclaredType;
