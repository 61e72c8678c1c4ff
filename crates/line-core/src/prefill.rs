//! Copia de la instrucción del step anterior al crear un Review.
//!
//! Es la única operación que modifica datos: cambia la instrucción del step
//! recibido. Guardarlo es responsabilidad de quien llama.
use line_domain::{Instruction, Step, StepKind};
use log::debug;

use crate::chain::StepChain;

/// Copia la instrucción del step anterior en `step` cuando se pide un
/// Review. Los campos de formulario se agregan como copias nuevas; una
/// plantilla reemplaza la instrucción. Devuelve si `step` cambió.
pub fn prefill_from_previous(chain: &StepChain<'_>, step: &mut Step, requested: StepKind) -> bool {
    if requested != StepKind::Review {
        return false;
    }
    let Some(source) = chain.previous_step(step).and_then(|prev| prev.instruction.as_ref()) else {
        return false;
    };
    match source {
        Instruction::FormFields { fields } => {
            let copies = fields.iter().map(|f| f.duplicate());
            match step.instruction.as_mut() {
                Some(Instruction::FormFields { fields: own }) => own.extend(copies),
                _ => step.instruction = Some(Instruction::form(copies.collect())),
            }
        }
        Instruction::RawTemplate { .. } => step.instruction = Some(source.duplicate()),
    }
    debug!("prefill_from_previous step={} raw={}", step.id, source.is_raw());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_domain::{FormField, Line};

    fn line_with(first: Step) -> Line {
        let mut line = Line::new("l");
        line.append_step(first).unwrap();
        line
    }

    #[test]
    fn review_copies_form_fields_with_new_identity() {
        let line = line_with(Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("weight"),
                                                                                              FormField::text("color")])));
        let chain = StepChain::new(&line);
        let mut draft = Step::new(StepKind::Review);
        assert!(prefill_from_previous(&chain, &mut draft, StepKind::Review));

        let Some(Instruction::FormFields { fields }) = &draft.instruction else { panic!("expected form fields") };
        let Some(Instruction::FormFields { fields: original }) = &line.ordered_steps()[0].instruction else { unreachable!() };
        assert_eq!(fields.iter().map(|f| f.label.as_str()).collect::<Vec<_>>(), vec!["weight", "color"]);
        assert!(fields.iter().zip(original).all(|(c, o)| c.id != o.id));
    }

    #[test]
    fn form_fields_are_appended_to_existing_ones() {
        let line = line_with(Step::new(StepKind::Work).with_instruction(Instruction::form(vec![FormField::text("weight")])));
        let chain = StepChain::new(&line);
        let mut draft = Step::new(StepKind::Review).with_instruction(Instruction::form(vec![FormField::text("notes")]));
        prefill_from_previous(&chain, &mut draft, StepKind::Review);
        assert_eq!(draft.output_headers(), vec!["notes", "weight"]);
    }

    #[test]
    fn review_copies_raw_template() {
        let line = line_with(Step::new(StepKind::Work).with_instruction(Instruction::raw("<b>result[grade]</b>")));
        let chain = StepChain::new(&line);
        let mut draft = Step::new(StepKind::Review);
        assert!(prefill_from_previous(&chain, &mut draft, StepKind::Review));
        assert_eq!(draft.instruction, Some(Instruction::raw("<b>result[grade]</b>")));
    }

    #[test]
    fn work_request_or_missing_previous_changes_nothing() {
        let line = line_with(Step::new(StepKind::Work).with_instruction(Instruction::raw("result[a]")));
        let chain = StepChain::new(&line);
        let mut draft = Step::new(StepKind::Work);
        assert!(!prefill_from_previous(&chain, &mut draft, StepKind::Work));
        assert!(draft.instruction.is_none());

        let empty = Line::new("empty");
        let mut first = Step::new(StepKind::Review);
        assert!(!prefill_from_previous(&StepChain::new(&empty), &mut first, StepKind::Review));
    }
}
