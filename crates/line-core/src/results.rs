//! Tabla de resultados de un run para un step.
//!
//! La salida real de un step es lo que recibió el step siguiente de la misma
//! unidad (`input_datas` de la instancia siguiente). Si el step es el último
//! de la cadena, su salida es el resultado final de la unidad.
use line_domain::{Record, Run, Step};
use log::{debug, warn};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::repo::RunRepository;

/// Tabla columnar: una fila de encabezados seguida de filas de datos.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    header: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn header_only(header: Vec<String>) -> Self {
        Self { header, rows: Vec::new() }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Filas de datos (sin contar el encabezado).
    pub fn data_row_count(&self) -> usize {
        self.rows.len()
    }

    /// Tabla completa con el encabezado como primera fila.
    pub fn to_table(&self) -> Vec<Vec<Value>> {
        let mut table = Vec::with_capacity(self.rows.len() + 1);
        table.push(self.header.iter().cloned().map(Value::String).collect());
        table.extend(self.rows.iter().cloned());
        table
    }

    fn push_records<'r>(&mut self, records: impl IntoIterator<Item = &'r Record>) {
        self.rows.extend(records.into_iter().map(record_row));
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("ResultTable", 1)?;
        st.serialize_field("result", &self.to_table())?;
        st.end()
    }
}

/// Valores del registro en orden de clave.
fn record_row(record: &Record) -> Vec<Value> {
    record.values().cloned().collect()
}

pub struct ResultAggregator<'r, R: RunRepository + ?Sized> {
    runs: &'r R,
}

impl<'r, R: RunRepository + ?Sized> ResultAggregator<'r, R> {
    pub fn new(runs: &'r R) -> Self {
        Self { runs }
    }

    /// Sin `run_id` sólo el encabezado; con `run_id` las filas producidas por
    /// el step en cada unidad del run.
    pub fn get_results(&self, step: &Step, run_id: Option<Uuid>) -> Result<ResultTable, CoreError> {
        let Some(run_id) = run_id else {
            return Ok(ResultTable::header_only(step.output_headers()));
        };
        let run = self.runs.find_run(run_id)?;
        Ok(results_for_run(step, &run))
    }
}

/// Recorre las unidades del run en orden y agrega las filas del step.
pub fn results_for_run(step: &Step, run: &Run) -> ResultTable {
    let mut table = ResultTable::header_only(step.output_headers());
    for unit in run.units() {
        for instance in unit.step_instances().iter().filter(|i| i.step_id == step.id) {
            match unit.next_step_instance(instance) {
                Some(next) => table.push_records(&next.input_datas),
                None => {
                    if let Some(missing) = instance.next_step_instance {
                        warn!("unit {} links to missing instance {missing}; treating {} as terminal",
                              unit.id,
                              instance.id);
                    }
                    table.push_records(unit.result_records());
                }
            }
        }
    }
    debug!("results_for_run step={} run={} rows={}", step.id, run.id, table.data_row_count());
    table
}
