//! Errores del core de resolución y agregación.

use line_domain::DomainError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error("run not found: {0}")] RunNotFound(Uuid),
    #[error("line not found: {0}")] LineNotFound(Uuid),
    #[error("step not found: {0}")] StepNotFound(Uuid),
    #[error("run {0} has no units")] EmptyRun(Uuid),
    #[error("store: {0}")] Store(String),
    #[error("fixture: {0}")] Fixture(String),
    #[error(transparent)] Domain(#[from] DomainError),
}

impl CoreError {
    /// Errores de búsqueda (la entidad identificada no existe).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::RunNotFound(_) | CoreError::LineNotFound(_) | CoreError::StepNotFound(_))
    }
}
