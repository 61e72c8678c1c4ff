//! Ejecuciones: `Run` → `Unit` → cadena de `StepInstance`.
//!
//! Dentro de una unidad las instancias forman una cadena enlazada por
//! identificador (`next_step_instance`) que replica el orden de la línea.
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{DomainError, Line};

/// Registro campo → valor. El orden de iteración es el orden de las claves.
pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInstance {
    pub id: Uuid,
    pub step_id: Uuid,
    #[serde(default)]
    pub input_datas: Vec<Record>,
    #[serde(default)]
    pub next_step_instance: Option<Uuid>,
}

/// Una ejecución completa de la línea dentro de un run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    #[serde(default)]
    step_instances: Vec<StepInstance>,
    #[serde(default)]
    results: Vec<Record>,
}

impl Unit {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(),
               step_instances: Vec::new(),
               results: Vec::new() }
    }

    pub fn from_parts(id: Uuid, step_instances: Vec<StepInstance>, results: Vec<Record>) -> Self {
        Self { id,
               step_instances,
               results }
    }

    /// Agrega la instancia del siguiente step y la enlaza desde la anterior.
    pub fn push_instance(&mut self, step_id: Uuid, input_datas: Vec<Record>) -> Uuid {
        let id = Uuid::new_v4();
        if let Some(tail) = self.tail_mut() {
            tail.next_step_instance = Some(id);
        }
        self.step_instances.push(StepInstance { id,
                                                step_id,
                                                input_datas,
                                                next_step_instance: None });
        id
    }

    /// Registra un resultado final (salida de toda la línea para esta unidad).
    pub fn push_result(&mut self, record: Record) {
        self.results.push(record);
    }

    pub fn step_instances(&self) -> &[StepInstance] {
        &self.step_instances
    }

    pub fn result_records(&self) -> &[Record] {
        &self.results
    }

    pub fn instance(&self, id: Uuid) -> Option<&StepInstance> {
        self.step_instances.iter().find(|i| i.id == id)
    }

    pub fn next_step_instance(&self, instance: &StepInstance) -> Option<&StepInstance> {
        instance.next_step_instance.and_then(|id| self.instance(id))
    }

    fn tail_mut(&mut self) -> Option<&mut StepInstance> {
        self.step_instances.iter_mut().find(|i| i.next_step_instance.is_none())
    }

    /// Instancias en orden de cadena, partiendo de la que nadie referencia.
    pub fn chain(&self) -> Vec<&StepInstance> {
        let referenced: HashSet<Uuid> = self.step_instances.iter().filter_map(|i| i.next_step_instance).collect();
        let mut ordered = Vec::with_capacity(self.step_instances.len());
        let mut cursor = self.step_instances.iter().find(|i| !referenced.contains(&i.id));
        while let Some(inst) = cursor {
            if ordered.len() == self.step_instances.len() {
                break;
            }
            ordered.push(inst);
            cursor = self.next_step_instance(inst);
        }
        ordered
    }

    /// Verifica que la cadena replique el orden de la línea (un prefijo si la
    /// unidad aún no terminó).
    pub fn verify_chain(&self, line: &Line) -> Result<(), DomainError> {
        let chain = self.chain();
        if chain.len() != self.step_instances.len() {
            return Err(DomainError::Validation(format!("unit {} has a broken step instance chain", self.id)));
        }
        let steps = line.ordered_steps();
        if chain.len() > steps.len() {
            return Err(DomainError::Validation(format!("unit {} has more instances than line {} has steps", self.id, line.id)));
        }
        for (idx, (inst, step)) in chain.iter().zip(steps).enumerate() {
            if inst.step_id != step.id {
                return Err(DomainError::Validation(format!("unit {}: instance at {} belongs to step {}, expected {}",
                                                           self.id, idx, inst.step_id, step.id)));
            }
        }
        Ok(())
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::new()
    }
}

/// Una campaña de ejecución de una línea sobre muchas unidades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub line_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    units: Vec<Unit>,
}

impl Run {
    pub fn new(line_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(),
               line_id,
               created_at: Utc::now(),
               units: Vec::new() }
    }

    pub fn from_parts(id: Uuid, line_id: Uuid, created_at: DateTime<Utc>, units: Vec<Unit>) -> Self {
        Self { id,
               line_id,
               created_at,
               units }
    }

    pub fn push_unit(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}
