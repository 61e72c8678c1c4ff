//! Contratos de lectura del almacenamiento y backend en memoria.
//!
//! El core sólo conoce estas interfaces: una línea con sus steps en orden y
//! un run con sus unidades y cadenas de instancias. Cada llamada devuelve una
//! instantánea; nada se cachea entre llamadas.
use indexmap::IndexMap;
use line_domain::{Line, Run, Step};
use log::debug;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::repo::Fixture;

pub trait LineRepository {
    /// Línea con sus steps en el orden actual.
    fn find_line(&self, line_id: Uuid) -> Result<Line, CoreError>;

    /// Guarda un step: reemplaza el existente o lo agrega al final.
    fn save_step(&mut self, line_id: Uuid, step: &Step) -> Result<(), CoreError>;
}

pub trait RunRepository {
    /// Run con sus unidades en orden de iteración.
    fn find_run(&self, run_id: Uuid) -> Result<Run, CoreError>;
}

/// Backend en memoria; conserva el orden de inserción.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    lines: IndexMap<Uuid, Line>,
    runs: IndexMap<Uuid, Run>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Result<Self, CoreError> {
        let mut store = Self::new();
        for line in fixture.lines {
            store.insert_line(line);
        }
        for run in fixture.runs {
            store.insert_run(run)?;
        }
        Ok(store)
    }

    pub fn insert_line(&mut self, line: Line) {
        self.lines.insert(line.id, line);
    }

    /// Inserta un run verificando que su línea exista y que cada unidad
    /// replique el orden de la línea.
    pub fn insert_run(&mut self, run: Run) -> Result<(), CoreError> {
        let line = self.lines.get(&run.line_id).ok_or(CoreError::LineNotFound(run.line_id))?;
        for unit in run.units() {
            unit.verify_chain(line)?;
        }
        self.runs.insert(run.id, run);
        Ok(())
    }
}

impl LineRepository for InMemoryStore {
    fn find_line(&self, line_id: Uuid) -> Result<Line, CoreError> {
        self.lines.get(&line_id).cloned().ok_or(CoreError::LineNotFound(line_id))
    }

    fn save_step(&mut self, line_id: Uuid, step: &Step) -> Result<(), CoreError> {
        let line = self.lines.get_mut(&line_id).ok_or(CoreError::LineNotFound(line_id))?;
        if line.contains(step.id) {
            line.replace_step(step.clone())?;
        } else {
            line.append_step(step.clone())?;
        }
        debug!("save_step line={line_id} step={} steps={}", step.id, line.step_count());
        Ok(())
    }
}

impl RunRepository for InMemoryStore {
    fn find_run(&self, run_id: Uuid) -> Result<Run, CoreError> {
        self.runs.get(&run_id).cloned().ok_or(CoreError::RunNotFound(run_id))
    }
}
