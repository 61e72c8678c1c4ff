use line_core::CoreError;
use line_domain::DomainError;
use line_persistence::PersistenceError;
use thiserror::Error;

/// Error de aplicación que agrupa los de cada capa.
#[derive(Debug, Error)]
pub enum LineflowError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Error de configuración: {0}")]
    Config(String),
}

impl LineflowError {
    pub fn is_not_found(&self) -> bool {
        match self {
            LineflowError::Core(e) => e.is_not_found(),
            LineflowError::Persistence(PersistenceError::NotFound) => true,
            _ => false,
        }
    }
}
