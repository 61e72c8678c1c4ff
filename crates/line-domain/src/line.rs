//! Línea: secuencia ordenada de steps más los encabezados de entrada propios.
//!
//! El orden de `steps` es total y sólo crece por el final. La posición de un
//! step se calcula siempre contra el orden actual; nunca se guarda.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DomainError, Step};

/// Entrada externa declarada por la línea (alimenta al primer step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInputHeader {
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub validation_format: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl LineInputHeader {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(),
               value: value.into(),
               validation_format: None,
               required: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub input_headers: Vec<LineInputHeader>,
    #[serde(default)]
    steps: Vec<Step>,
}

impl Line {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               input_headers: Vec::new(),
               steps: Vec::new() }
    }

    pub fn with_input_headers(mut self, headers: Vec<LineInputHeader>) -> Self {
        self.input_headers = headers;
        self
    }

    /// Agrega un step al final. Un id repetido se rechaza.
    pub fn append_step(&mut self, step: Step) -> Result<usize, DomainError> {
        if self.contains(step.id) {
            return Err(DomainError::Validation(format!("step {} already belongs to line {}", step.id, self.id)));
        }
        self.steps.push(step);
        Ok(self.steps.len() - 1)
    }

    pub fn ordered_steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn contains(&self, step_id: Uuid) -> bool {
        self.steps.iter().any(|s| s.id == step_id)
    }

    /// Índice (base 0) del step en el orden actual.
    pub fn position_of(&self, step_id: Uuid) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: Uuid) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: Uuid) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// Reemplaza un step existente conservando su posición.
    pub fn replace_step(&mut self, step: Step) -> Result<(), DomainError> {
        match self.step_mut(step.id) {
            Some(slot) => {
                *slot = step;
                Ok(())
            }
            None => Err(DomainError::Validation(format!("step {} does not belong to line {}", step.id, self.id))),
        }
    }

    pub fn input_labels(&self) -> Vec<String> {
        self.input_headers.iter().map(|h| h.label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepKind;

    #[test]
    fn append_keeps_order_and_positions() {
        let mut line = Line::new("inspection");
        let a = Step::new(StepKind::Work);
        let b = Step::new(StepKind::Review);
        let (a_id, b_id) = (a.id, b.id);
        assert_eq!(line.append_step(a).unwrap(), 0);
        assert_eq!(line.append_step(b).unwrap(), 1);
        assert_eq!(line.position_of(a_id), Some(0));
        assert_eq!(line.position_of(b_id), Some(1));
        assert_eq!(line.step_count(), 2);
    }

    #[test]
    fn duplicate_step_is_rejected() {
        let mut line = Line::new("inspection");
        let a = Step::new(StepKind::Work);
        line.append_step(a.clone()).unwrap();
        assert!(matches!(line.append_step(a), Err(DomainError::Validation(_))));
    }

    #[test]
    fn replace_unknown_step_fails() {
        let mut line = Line::new("inspection");
        assert!(line.replace_step(Step::new(StepKind::Work)).is_err());
    }
}
