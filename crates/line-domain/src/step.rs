//! Step de una línea: tipo (Work / Review), worker asignado e instrucción.
//!
//! El tipo se normaliza una sola vez en la frontera de entrada (`FromStr` /
//! deserialización), sin distinguir mayúsculas. Un valor desconocido es un
//! error de configuración (`DomainError::UnknownStepKind`).
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DomainError, Instruction};

/// Tipo de un step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepKind {
    /// Produce nuevos campos de salida.
    Work,
    /// Re-examina la salida del último step Work.
    Review,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Work => "work",
            StepKind::Review => "review",
        }
    }
}

impl FromStr for StepKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(StepKind::Work),
            "review" => Ok(StepKind::Review),
            _ => Err(DomainError::UnknownStepKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for StepKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operador o herramienta asignada a un step. `number` determina qué tipos
/// de step pueden seguirle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub number: u32,
}

impl Worker {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               number }
    }
}

/// Un step pertenece a exactamente una `Line`. Su posición no se almacena: se
/// deriva del orden actual de la línea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub kind: StepKind,
    #[serde(default)]
    pub worker: Option<Worker>,
    #[serde(default)]
    pub instruction: Option<Instruction>,
}

impl Step {
    /// Crea un step nuevo (aún no agregado a ninguna línea).
    pub fn new(kind: StepKind) -> Self {
        Self { id: Uuid::new_v4(),
               kind,
               worker: None,
               instruction: None }
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instruction = Some(instruction);
        self
    }

    pub fn with_worker(mut self, worker: Worker) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn is_work(&self) -> bool {
        self.kind == StepKind::Work
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Un step está completo cuando tiene worker, tiene instrucción y la
    /// instrucción es utilizable. La ausencia de cualquiera da `false`.
    pub fn is_complete(&self) -> bool {
        self.worker.is_some() && self.instruction.as_ref().is_some_and(Instruction::is_complete)
    }

    /// Encabezados de salida declarados por la instrucción (vacío sin
    /// instrucción).
    pub fn output_headers(&self) -> Vec<String> {
        self.instruction
            .as_ref()
            .map(Instruction::output_headers)
            .unwrap_or_default()
    }
}
