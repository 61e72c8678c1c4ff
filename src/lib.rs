//! Lineflow
//!
//! Núcleo de líneas de inspección:
//! - `line_domain`: líneas, steps, instrucciones y runs.
//! - `line_core`: cadena de steps, encabezados, resultados y progreso.
//! - `line_persistence`: almacenamiento Postgres.
//!
//! Este crate los re-exporta y agrega un error de nivel aplicación.

pub mod errors;

pub use errors::LineflowError;
pub use line_core::{allowed_kinds, prefill_from_previous, progress, result_source, Fixture, HeaderDeriver, InMemoryStore,
                    InputHeader, LineRepository, LineService, ResultAggregator, ResultSource, ResultTable,
                    RunRepository, StepChain};
pub use line_domain::{FieldType, FormField, Instruction, Line, LineInputHeader, Record, Run, Step, StepInstance, StepKind,
                      Unit, Worker};

#[cfg(test)]
mod tests {
    use super::*;
    use line_core::CoreError;

    #[test]
    fn core_error_wraps_transparently() {
        let id = uuid::Uuid::nil();
        let err: LineflowError = CoreError::RunNotFound(id).into();
        assert_eq!(err.to_string(), CoreError::RunNotFound(id).to_string());
        assert!(err.is_not_found());
    }
}
