//! Fachada por identificadores sobre un almacenamiento.
//!
//! Cada operación carga una instantánea de la línea (y del run cuando hace
//! falta) y delega en los módulos puros. Sólo `prefill_step` escribe.
use line_domain::{Line, Step, StepKind};
use log::debug;
use uuid::Uuid;

use crate::chain::StepChain;
use crate::errors::CoreError;
use crate::gate::allowed_kinds;
use crate::headers::{HeaderDeriver, InputHeader};
use crate::prefill::prefill_from_previous;
use crate::progress::progress;
use crate::repo::{LineRepository, RunRepository};
use crate::results::{ResultAggregator, ResultTable};
use crate::source::{result_source, ResultSource};

pub struct LineService<S> {
    store: S,
}

impl<S: LineRepository + RunRepository> LineService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Línea y copia del step; el step debe pertenecer a la línea.
    fn load(&self, line_id: Uuid, step_id: Uuid) -> Result<(Line, Step), CoreError> {
        let line = self.store.find_line(line_id)?;
        let step = line.step(step_id).cloned().ok_or(CoreError::StepNotFound(step_id))?;
        Ok((line, step))
    }

    pub fn output_headers(&self, line_id: Uuid, step_id: Uuid) -> Result<Vec<String>, CoreError> {
        let (line, step) = self.load(line_id, step_id)?;
        Ok(HeaderDeriver::new(&line).output_headers(&step))
    }

    /// `None` cuando las entradas no están definidas (Review sin Work previo).
    pub fn input_headers(&self, line_id: Uuid, step_id: Uuid, with_values: bool) -> Result<Option<Vec<InputHeader>>, CoreError> {
        let (line, step) = self.load(line_id, step_id)?;
        Ok(HeaderDeriver::new(&line).input_headers(&step, with_values))
    }

    pub fn get_results(&self, line_id: Uuid, step_id: Uuid, run_id: Option<Uuid>) -> Result<ResultTable, CoreError> {
        let (_, step) = self.load(line_id, step_id)?;
        ResultAggregator::new(&self.store).get_results(&step, run_id)
    }

    pub fn progress(&self, line_id: Uuid, step_id: Uuid, run_id: Uuid) -> Result<f64, CoreError> {
        let (_, step) = self.load(line_id, step_id)?;
        progress(&self.store, &step, run_id)
    }

    pub fn is_complete(&self, line_id: Uuid, step_id: Uuid) -> Result<bool, CoreError> {
        self.load(line_id, step_id).map(|(_, step)| step.is_complete())
    }

    pub fn has_worker(&self, line_id: Uuid, step_id: Uuid) -> Result<bool, CoreError> {
        self.load(line_id, step_id).map(|(_, step)| step.has_worker())
    }

    pub fn previous_step(&self, line_id: Uuid, step_id: Uuid) -> Result<Option<Step>, CoreError> {
        let (line, step) = self.load(line_id, step_id)?;
        Ok(StepChain::new(&line).previous_step(&step).cloned())
    }

    pub fn last_work_step(&self, line_id: Uuid, step_id: Uuid) -> Result<Option<Step>, CoreError> {
        let (line, step) = self.load(line_id, step_id)?;
        Ok(StepChain::new(&line).last_work_step(&step).cloned())
    }

    pub fn allowed_kinds(&self, line_id: Uuid, step_id: Uuid) -> Result<&'static [StepKind], CoreError> {
        let (line, step) = self.load(line_id, step_id)?;
        Ok(allowed_kinds(&StepChain::new(&line), &step))
    }

    /// Tipos admitidos para el próximo step que se agregue a la línea.
    pub fn allowed_kinds_for_new(&self, line_id: Uuid) -> Result<&'static [StepKind], CoreError> {
        let line = self.store.find_line(line_id)?;
        Ok(allowed_kinds(&StepChain::new(&line), &Step::new(StepKind::Work)))
    }

    pub fn result_source(&self, line_id: Uuid, step_id: Uuid, run_id: Option<Uuid>) -> Result<ResultSource, CoreError> {
        let (line, step) = self.load(line_id, step_id)?;
        result_source(&StepChain::new(&line), &self.store, &step, run_id)
    }
}

impl<S: LineRepository + RunRepository> LineService<S> {
    /// Precarga `step` (nuevo o existente) con la instrucción del anterior
    /// si se pide un Review, y lo guarda cuando cambia.
    pub fn prefill_step(&mut self, line_id: Uuid, mut step: Step, requested: StepKind) -> Result<Step, CoreError> {
        let line = self.store.find_line(line_id)?;
        let changed = prefill_from_previous(&StepChain::new(&line), &mut step, requested);
        if changed {
            self.store.save_step(line_id, &step)?;
        }
        debug!("prefill_step line={line_id} step={} changed={changed}", step.id);
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::InMemoryStore;
    use line_domain::{FormField, Instruction, Worker};

    fn service() -> (LineService<InMemoryStore>, Uuid, Vec<Uuid>) {
        let mut line = Line::new("svc");
        let w = Step::new(StepKind::Work).with_worker(Worker::new("ana", 1))
                                         .with_instruction(Instruction::form(vec![FormField::text("weight")]));
        let r = Step::new(StepKind::Review);
        let ids = vec![w.id, r.id];
        line.append_step(w).unwrap();
        line.append_step(r).unwrap();
        let line_id = line.id;
        let mut store = InMemoryStore::new();
        store.insert_line(line);
        (LineService::new(store), line_id, ids)
    }

    #[test]
    fn step_from_other_line_is_not_found() {
        let (svc, line_id, _) = service();
        let stranger = Uuid::new_v4();
        assert_eq!(svc.output_headers(line_id, stranger), Err(CoreError::StepNotFound(stranger)));
    }

    #[test]
    fn chain_queries_by_id() {
        let (svc, line_id, ids) = service();
        assert_eq!(svc.previous_step(line_id, ids[1]).unwrap().map(|s| s.id), Some(ids[0]));
        assert_eq!(svc.last_work_step(line_id, ids[1]).unwrap().map(|s| s.id), Some(ids[0]));
        assert!(svc.previous_step(line_id, ids[0]).unwrap().is_none());
        assert!(svc.is_complete(line_id, ids[0]).unwrap());
        assert!(!svc.is_complete(line_id, ids[1]).unwrap());
        assert_eq!(svc.allowed_kinds(line_id, ids[1]).unwrap(), &[StepKind::Work, StepKind::Review]);
    }

    #[test]
    fn prefill_without_source_instruction_is_noop() {
        let (mut svc, line_id, _) = service();
        let draft = Step::new(StepKind::Review);
        let draft_id = draft.id;
        let saved = svc.prefill_step(line_id, draft, StepKind::Review).unwrap();
        // el anterior del borrador es el Review sin instrucción: nada que copiar
        assert!(saved.instruction.is_none());
        assert!(svc.store().find_line(line_id).unwrap().step(draft_id).is_none());
    }

    #[test]
    fn prefill_saves_changed_step() {
        let (mut svc, line_id, ids) = service();
        let review = svc.store().find_line(line_id).unwrap().step(ids[1]).cloned().unwrap();
        let saved = svc.prefill_step(line_id, review, StepKind::Review).unwrap();
        let Some(Instruction::FormFields { fields }) = saved.instruction else { panic!("expected copy") };
        assert_eq!(fields[0].label, "weight");
        let stored = svc.store().find_line(line_id).unwrap();
        assert_eq!(stored.step(ids[1]).unwrap().output_headers(), vec!["weight"]);
        assert_eq!(stored.step_count(), 2);
    }
}
