use thiserror::Error;

/// Errores del dominio de líneas de inspección.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown step kind: {0}")]
    UnknownStepKind(String),
    #[error("validation failed: {0}")]
    Validation(String),
}
