//! Tipos de step permitidos según el worker del step anterior.
use line_domain::{Step, StepKind};

use crate::chain::StepChain;
use crate::constants::MAX_GATED_WORKER_NUMBER;

const NO_WORKER: &[StepKind] = &[StepKind::Work];
const ANY_KIND: &[StepKind] = &[StepKind::Work, StepKind::Review];

/// Fila de la tabla para un número de worker (los mayores al máximo usan la
/// fila del máximo).
pub fn kinds_for_worker(number: u32) -> &'static [StepKind] {
    match number.min(MAX_GATED_WORKER_NUMBER) {
        0 => NO_WORKER,
        _ => ANY_KIND,
    }
}

/// Tipos que puede tomar `step` en su posición actual. Una línea vacía o un
/// anterior sin worker sólo admite Work.
pub fn allowed_kinds(chain: &StepChain<'_>, step: &Step) -> &'static [StepKind] {
    let number = chain.previous_step(step)
                      .and_then(|prev| prev.worker.as_ref())
                      .map(|w| w.number)
                      .unwrap_or(0);
    kinds_for_worker(number)
}
