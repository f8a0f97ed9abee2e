use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("canonical schema has no fields")]
    EmptySchema,
    #[error("duplicate canonical field: {name}")]
    DuplicateField { name: String },
    #[error("blank canonical field name at position {position}")]
    BlankField { position: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
