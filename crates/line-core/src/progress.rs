//! Porcentaje de avance de un run en un step.
use line_domain::Step;
use log::debug;
use uuid::Uuid;

use crate::constants::PROGRESS_DECIMALS;
use crate::errors::CoreError;
use crate::repo::RunRepository;
use crate::results::results_for_run;

/// `100 * completed / total`, redondeado a dos decimales y acotado a
/// `[0, 100]`. `None` si `total` es cero.
pub fn percentage(completed: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let factor = 10f64.powi(PROGRESS_DECIMALS);
    let raw = 100.0 * completed as f64 / total as f64;
    Some(((raw * factor).round() / factor).min(100.0))
}

/// Filas de datos producidas por el step sobre el total de unidades del run.
/// Un run sin unidades es `CoreError::EmptyRun`.
pub fn progress<R: RunRepository + ?Sized>(runs: &R, step: &Step, run_id: Uuid) -> Result<f64, CoreError> {
    let run = runs.find_run(run_id)?;
    let count = results_for_run(step, &run).data_row_count();
    let pct = percentage(count, run.unit_count()).ok_or(CoreError::EmptyRun(run_id))?;
    debug!("progress step={} run={run_id} rows={count} units={} pct={pct}", step.id, run.unit_count());
    Ok(pct)
}
