//! Origen de los datos que precargan el formulario de resultados de un step.
use line_domain::Step;
use serde::Serialize;
use uuid::Uuid;

use crate::chain::StepChain;
use crate::errors::CoreError;
use crate::repo::RunRepository;
use crate::results::{ResultAggregator, ResultTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ResultSource {
    /// El step es el primero: se cargan las entradas propias de la línea,
    /// columna por columna.
    LineInputs {
        labels: Vec<String>,
        values: Vec<String>,
        validation_formats: Vec<Option<String>>,
        required: Vec<bool>,
    },
    /// Resultados del step anterior en el run.
    PreviousResults(ResultTable),
}

impl ResultSource {
    /// Indica si hay que cargar datos del run.
    pub fn load_data(&self) -> bool {
        matches!(self, ResultSource::PreviousResults(_))
    }
}

pub fn result_source<R: RunRepository + ?Sized>(chain: &StepChain<'_>,
                                                 runs: &R,
                                                 step: &Step,
                                                 run_id: Option<Uuid>)
                                                 -> Result<ResultSource, CoreError> {
    match chain.previous_step(step) {
        Some(prev) => ResultAggregator::new(runs).get_results(prev, run_id).map(ResultSource::PreviousResults),
        None => {
            let headers = &chain.line().input_headers;
            Ok(ResultSource::LineInputs { labels: headers.iter().map(|h| h.label.clone()).collect(),
                                          values: headers.iter().map(|h| h.value.clone()).collect(),
                                          validation_formats: headers.iter().map(|h| h.validation_format.clone()).collect(),
                                          required: headers.iter().map(|h| h.required).collect() })
        }
    }
}
