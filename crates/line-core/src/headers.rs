//! Derivación de encabezados de entrada y salida de un step.
//!
//! Por convención las entradas de un step son las salidas declaradas del step
//! anterior; un Review hereda las entradas de su último Work. El primer step
//! de la línea toma las entradas declaradas por la propia línea.
use line_domain::{Line, Step, StepKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::chain::StepChain;
use crate::constants::PREVIOUS_RESULT_SENTINEL;

/// Encabezado de entrada. `value` sólo se completa cuando se piden valores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputHeader {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl InputHeader {
    pub fn label(label: impl Into<String>) -> Self {
        Self { label: label.into(), value: None }
    }

    pub fn valued(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(),
               value: Some(value.into()) }
    }

    /// Entrada producida en ejecución por el step anterior.
    pub fn from_previous(label: impl Into<String>) -> Self {
        Self::valued(label, PREVIOUS_RESULT_SENTINEL)
    }

    pub fn is_dynamic(&self) -> bool {
        self.value.as_deref() == Some(PREVIOUS_RESULT_SENTINEL)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderDeriver<'a> {
    chain: StepChain<'a>,
}

impl<'a> HeaderDeriver<'a> {
    pub fn new(line: &'a Line) -> Self {
        Self { chain: StepChain::new(line) }
    }

    pub fn output_headers(&self, step: &Step) -> Vec<String> {
        step.output_headers()
    }

    /// Encabezados de entrada del step; con `with_values` cada uno lleva su
    /// valor (el de la línea o el centinela de resultado previo).
    ///
    /// Devuelve `None` para un Review sin Work anterior: sus entradas no
    /// están definidas.
    pub fn input_headers(&self, step: &Step, with_values: bool) -> Option<Vec<InputHeader>> {
        let headers = match step.kind {
            StepKind::Review => self.review_inputs(step, with_values),
            StepKind::Work => Some(self.work_inputs(step, with_values)),
        };
        debug!("input_headers step={} kind={} with_values={} count={:?}",
               step.id,
               step.kind,
               with_values,
               headers.as_ref().map(Vec::len));
        headers
    }

    /// Sólo etiquetas.
    pub fn input_labels(&self, step: &Step) -> Option<Vec<String>> {
        self.input_headers(step, false)
            .map(|hs| hs.into_iter().map(|h| h.label).collect())
    }

    fn review_inputs(&self, step: &Step, with_values: bool) -> Option<Vec<InputHeader>> {
        let Some(work) = self.chain.last_work_step(step) else {
            warn!("review step {} has no work ancestor; input headers undefined", step.id);
            return None;
        };
        let base = self.work_inputs(work, false);
        if !with_values {
            return Some(base);
        }
        if self.chain.position(work) == Some(0) {
            return Some(self.line_inputs(true));
        }
        Some(base.into_iter().map(|h| InputHeader::from_previous(h.label)).collect())
    }

    fn work_inputs(&self, step: &Step, with_values: bool) -> Vec<InputHeader> {
        let Some(prev) = self.chain.previous_step(step) else {
            return self.line_inputs(with_values);
        };
        let labels = prev.instruction
                         .as_ref()
                         .map(|ins| ins.declared_headers())
                         .unwrap_or_default();
        labels.into_iter()
              .map(|l| if with_values { InputHeader::from_previous(l) } else { InputHeader::label(l) })
              .collect()
    }

    fn line_inputs(&self, with_values: bool) -> Vec<InputHeader> {
        self.chain
            .line()
            .input_headers
            .iter()
            .map(|h| {
                if with_values {
                    InputHeader::valued(h.label.clone(), h.value.clone())
                } else {
                    InputHeader::label(h.label.clone())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_domain::{FormField, Instruction, LineInputHeader};

    fn labels(hs: &[InputHeader]) -> Vec<&str> {
        hs.iter().map(|h| h.label.as_str()).collect()
    }

    fn line_with(steps: Vec<Step>) -> Line {
        let mut line = Line::new("headers").with_input_headers(vec![LineInputHeader::new("batch", "B-7"),
                                                                    LineInputHeader::new("operator", "ana")]);
        for s in steps {
            line.append_step(s).unwrap();
        }
        line
    }

    #[test]
    fn first_work_step_takes_line_inputs() {
        let line = line_with(vec![Step::new(StepKind::Work)]);
        let deriver = HeaderDeriver::new(&line);
        let first = &line.ordered_steps()[0];
        assert_eq!(deriver.input_labels(first).unwrap(), vec!["batch", "operator"]);
        let valued = deriver.input_headers(first, true).unwrap();
        assert_eq!(valued[0], InputHeader::valued("batch", "B-7"));
        assert_eq!(valued[1], InputHeader::valued("operator", "ana"));
    }

    #[test]
    fn work_after_raw_template_uses_scan_order() {
        let raw = Step::new(StepKind::Work).with_instruction(Instruction::raw("result[zeta] result[alpha] result[zeta]"));
        let line = line_with(vec![raw, Step::new(StepKind::Work)]);
        let deriver = HeaderDeriver::new(&line);
        let second = &line.ordered_steps()[1];
        assert_eq!(deriver.input_labels(second).unwrap(), vec!["zeta", "alpha"]);
        let valued = deriver.input_headers(second, true).unwrap();
        assert!(valued.iter().all(InputHeader::is_dynamic));
    }

    #[test]
    fn work_after_form_fields_uses_declared_order() {
        let form = Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("width"),
                                                                                     FormField::text("height")]));
        let line = line_with(vec![form, Step::new(StepKind::Work)]);
        let deriver = HeaderDeriver::new(&line);
        assert_eq!(deriver.input_labels(&line.ordered_steps()[1]).unwrap(), vec!["width", "height"]);
    }

    #[test]
    fn work_after_form_fields_keeps_repeated_labels() {
        let form = Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("b"),
                                                                                     FormField::text("a"),
                                                                                     FormField::text("b")]));
        let line = line_with(vec![form, Step::new(StepKind::Work)]);
        let deriver = HeaderDeriver::new(&line);
        let steps = line.ordered_steps();
        assert_eq!(deriver.input_labels(&steps[1]).unwrap(), vec!["b", "a", "b"]);
        assert_eq!(deriver.output_headers(&steps[0]), vec!["a", "b"]);
    }

    #[test]
    fn work_after_step_without_instruction_has_no_inputs() {
        let line = line_with(vec![Step::new(StepKind::Work), Step::new(StepKind::Work)]);
        let deriver = HeaderDeriver::new(&line);
        assert!(deriver.input_labels(&line.ordered_steps()[1]).unwrap().is_empty());
    }

    #[test]
    fn review_of_first_work_gets_line_values() {
        let w = Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("weight")]));
        let line = line_with(vec![w, Step::new(StepKind::Review), Step::new(StepKind::Review)]);
        let deriver = HeaderDeriver::new(&line);
        for review in &line.ordered_steps()[1..] {
            assert_eq!(deriver.input_labels(review).unwrap(), vec!["batch", "operator"]);
            let valued = deriver.input_headers(review, true).unwrap();
            assert_eq!(valued[0], InputHeader::valued("batch", "B-7"));
            assert!(!valued.iter().any(InputHeader::is_dynamic));
        }
    }

    #[test]
    fn review_of_later_work_gets_sentinel_values() {
        let w0 = Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("weight")]));
        let w1 = Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("grade")]));
        let line = line_with(vec![w0, w1, Step::new(StepKind::Review), Step::new(StepKind::Review)]);
        let deriver = HeaderDeriver::new(&line);
        for review in &line.ordered_steps()[2..] {
            let valued = deriver.input_headers(review, true).unwrap();
            assert_eq!(labels(&valued), vec!["weight"]);
            assert!(valued.iter().all(InputHeader::is_dynamic));
        }
    }

    #[test]
    fn review_without_work_is_undefined() {
        let line = line_with(vec![Step::new(StepKind::Review)]);
        let deriver = HeaderDeriver::new(&line);
        assert!(deriver.input_headers(&line.ordered_steps()[0], true).is_none());
        assert!(deriver.input_labels(&line.ordered_steps()[0]).is_none());
    }

    #[test]
    fn output_headers_delegate_to_instruction() {
        let w = Step::new(StepKind::Work).with_instruction(Instruction::raw("result[b] result[a]"));
        let line = line_with(vec![w]);
        let deriver = HeaderDeriver::new(&line);
        assert_eq!(deriver.output_headers(&line.ordered_steps()[0]), vec!["a", "b"]);
    }
}
