//! Demo: arma una línea `[Work, Review]`, simula un run y muestra cadena,
//! encabezados, resultados y progreso. Con `LINEFLOW_RUN_PG_DEMO=1` repite
//! las consultas contra Postgres.
use lineflow::{FormField, InMemoryStore, Instruction, Line, LineRepository, LineService, LineflowError, Record, Run,
               RunRepository, Step, StepKind, Unit, Worker};
use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

fn record(value: serde_json::Value) -> Result<Record, LineflowError> {
    serde_json::from_value(value).map_err(|e| LineflowError::Config(format!("registro inválido: {e}")))
}

fn build_demo() -> Result<(Line, Run, Uuid, Uuid), LineflowError> {
    let mut line = Line::new("pesaje");
    let work = Step::new(StepKind::Work).with_worker(Worker::new("balanza", 1))
                                        .with_instruction(Instruction::form(vec![FormField::text("weight").required()]));
    let review = Step::new(StepKind::Review).with_worker(Worker::new("qa", 2))
                                            .with_instruction(Instruction::raw("<td>result[checked]</td>"));
    let (w_id, r_id) = (work.id, review.id);
    line.append_step(work)?;
    line.append_step(review)?;

    let mut run = Run::new(line.id);
    for weight in [10, 11] {
        let mut unit = Unit::new();
        unit.push_instance(w_id, vec![]);
        unit.push_instance(r_id, vec![record(json!({ "weight": weight }))?]);
        unit.push_result(record(json!({ "checked": true }))?);
        run.push_unit(unit);
    }
    Ok((line, run, w_id, r_id))
}

fn report<S: LineRepository + RunRepository>(svc: &LineService<S>, line_id: Uuid, run_id: Uuid, steps: [Uuid; 2])
                                             -> Result<(), LineflowError> {
    for step_id in steps {
        info!("step {step_id}: output={:?} input={:?} complete={}",
              svc.output_headers(line_id, step_id)?,
              svc.input_headers(line_id, step_id, true)?,
              svc.is_complete(line_id, step_id)?);
        info!("step {step_id}: previous={:?} progress={}%",
              svc.previous_step(line_id, step_id)?.map(|s| s.id),
              svc.progress(line_id, step_id, run_id)?);
        let table = svc.get_results(line_id, step_id, Some(run_id))?;
        println!("{}", json!({ "step": step_id, "table": table.to_table() }));
    }
    Ok(())
}

fn run_pg_demo(line: &Line, run: &Run, steps: [Uuid; 2]) -> Result<(), LineflowError> {
    let pool = line_persistence::build_dev_pool_from_env()?;
    let store = line_persistence::PgLineStore::new(line_persistence::PoolProvider { pool });
    store.save_line(line)?;
    store.save_run(run)?;
    info!("[pg] línea {} y run {} guardados", line.id, run.id);
    report(&LineService::new(store), line.id, run.id, steps)
}

fn main() -> Result<(), LineflowError> {
    line_persistence::init_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (line, run, w_id, r_id) = build_demo()?;
    let mut store = InMemoryStore::new();
    store.insert_line(line.clone());
    store.insert_run(run.clone())?;
    report(&LineService::new(store), line.id, run.id, [w_id, r_id])?;

    if std::env::var("LINEFLOW_RUN_PG_DEMO").as_deref() == Ok("1") {
        if let Err(e) = run_pg_demo(&line, &run, [w_id, r_id]) {
            warn!("[pg] demo omitida: {e}");
        }
    }
    Ok(())
}
