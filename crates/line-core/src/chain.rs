//! Resolución de la cadena de steps de una línea.
//!
//! `StepChain` se construye sobre la línea tal como está en el momento de la
//! llamada; no guarda posiciones entre mutaciones. Un step que no pertenece a
//! la línea se considera nuevo: se agregará al final.
use line_domain::{Line, Step};

#[derive(Debug, Clone, Copy)]
pub struct StepChain<'a> {
    line: &'a Line,
}

impl<'a> StepChain<'a> {
    pub fn new(line: &'a Line) -> Self {
        Self { line }
    }

    pub fn line(&self) -> &'a Line {
        self.line
    }

    /// Posición (base 0) en el orden actual; `None` para un step nuevo.
    pub fn position(&self, step: &Step) -> Option<usize> {
        self.line.position_of(step.id)
    }

    /// Step lógicamente anterior.
    pub fn previous_step(&self, step: &Step) -> Option<&'a Step> {
        let steps = self.line.ordered_steps();
        if steps.is_empty() {
            return None;
        }
        match self.position(step) {
            None => steps.last(),
            Some(0) => None,
            Some(idx) => steps.get(idx - 1),
        }
    }

    /// El propio step si es Work; si no, el Work más cercano hacia atrás.
    /// `None` cuando ningún Work lo precede.
    pub fn last_work_step<'s>(&self, step: &'s Step) -> Option<&'s Step>
        where 'a: 's
    {
        if step.is_work() {
            return Some(step);
        }
        let mut cursor = self.previous_step(step);
        while let Some(prev) = cursor {
            if prev.is_work() {
                return Some(prev);
            }
            cursor = self.previous_step(prev);
        }
        None
    }
}
