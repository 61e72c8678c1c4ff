//! Implementación Postgres (Diesel) de los contratos del core.
//!
//! - `PgLineStore` implementa `LineRepository` y `RunRepository`.
//! - Cada lectura corre en una transacción `REPEATABLE READ` de sólo lectura:
//!   la línea (o el run) se arma sobre una única instantánea.
//! - El orden de la línea es la columna `lines.step_order`; la posición de un
//!   step nunca se guarda en `steps`.
//! - Reintento con backoff corto ante errores transitorios.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::upsert::excluded;
use line_core::{CoreError, LineRepository, RunRepository};
use line_domain::{Instruction, Line, LineInputHeader, Record, Run, Step, StepInstance, StepKind, Unit, Worker};
use log::{debug, error, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{lines, runs, step_instances, steps, units, workers};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o uno construido sólo para tests sin acoplar
/// el store a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = workers)]
struct WorkerRow {
    id: Uuid,
    name: String,
    number: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workers)]
struct NewWorkerRow<'a> {
    id: Uuid,
    name: &'a str,
    number: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = lines)]
struct LineRow {
    id: Uuid,
    name: String,
    input_headers: Value,
    step_order: Vec<Uuid>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = lines)]
struct NewLineRow<'a> {
    id: Uuid,
    name: &'a str,
    input_headers: Value,
    step_order: Vec<Uuid>,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = steps)]
struct StepRow {
    id: Uuid,
    line_id: Uuid,
    kind: String,
    worker_id: Option<Uuid>,
    instruction: Option<Value>,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = runs)]
struct RunRow {
    id: Uuid,
    line_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = units)]
struct UnitRow {
    id: Uuid,
    #[allow(dead_code)]
    run_id: Uuid,
    #[allow(dead_code)]
    seq: i64,
    results: Value,
}

/// `seq` lo asigna la base (BIGSERIAL) y define el orden de iteración.
#[derive(Insertable, Debug)]
#[diesel(table_name = units)]
struct NewUnitRow {
    id: Uuid,
    run_id: Uuid,
    results: Value,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = step_instances)]
struct StepInstanceRow {
    id: Uuid,
    unit_id: Uuid,
    step_id: Uuid,
    next_id: Option<Uuid>,
    input_datas: Value,
}

impl WorkerRow {
    fn into_worker(self) -> Result<Worker, PersistenceError> {
        let number = u32::try_from(self.number).map_err(|_| PersistenceError::Decode(format!("worker {} has negative number", self.id)))?;
        Ok(Worker { id: self.id,
                    name: self.name,
                    number })
    }
}

impl StepRow {
    fn from_step(line_id: Uuid, step: &Step) -> Result<Self, PersistenceError> {
        Ok(Self { id: step.id,
                  line_id,
                  kind: step.kind.as_str().to_string(),
                  worker_id: step.worker.as_ref().map(|w| w.id),
                  instruction: step.instruction.as_ref().map(serde_json::to_value).transpose()? })
    }

    fn into_step(self, workers: &HashMap<Uuid, Worker>) -> Result<Step, PersistenceError> {
        let kind: StepKind = self.kind.parse()?;
        let instruction = self.instruction
                              .map(serde_json::from_value::<Instruction>)
                              .transpose()?;
        Ok(Step { id: self.id,
                  kind,
                  worker: self.worker_id.and_then(|id| workers.get(&id).cloned()),
                  instruction })
    }
}

impl StepInstanceRow {
    fn from_instance(unit_id: Uuid, instance: &StepInstance) -> Result<Self, PersistenceError> {
        Ok(Self { id: instance.id,
                  unit_id,
                  step_id: instance.step_id,
                  next_id: instance.next_step_instance,
                  input_datas: serde_json::to_value(&instance.input_datas)? })
    }

    fn into_instance(self) -> Result<StepInstance, PersistenceError> {
        Ok(StepInstance { id: self.id,
                          step_id: self.step_id,
                          input_datas: serde_json::from_value(self.input_datas)?,
                          next_step_instance: self.next_id })
    }
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

fn upsert_worker(conn: &mut PgConnection, worker: &Worker) -> Result<(), PersistenceError> {
    let number = i32::try_from(worker.number).map_err(|_| PersistenceError::CheckViolation(format!("worker {} number out of range", worker.id)))?;
    diesel::insert_into(workers::table).values(NewWorkerRow { id: worker.id,
                                                             name: &worker.name,
                                                             number })
                                       .on_conflict(workers::id)
                                       .do_update()
                                       .set((workers::name.eq(excluded(workers::name)), workers::number.eq(excluded(workers::number))))
                                       .execute(conn)?;
    Ok(())
}

fn upsert_step(conn: &mut PgConnection, line_id: Uuid, step: &Step) -> Result<(), PersistenceError> {
    if let Some(worker) = &step.worker {
        upsert_worker(conn, worker)?;
    }
    let row = StepRow::from_step(line_id, step)?;
    diesel::insert_into(steps::table).values(&row)
                                     .on_conflict(steps::id)
                                     .do_update()
                                     .set((steps::kind.eq(excluded(steps::kind)),
                                           steps::worker_id.eq(excluded(steps::worker_id)),
                                           steps::instruction.eq(excluded(steps::instruction))))
                                     .execute(conn)?;
    Ok(())
}

/// Arma la línea con sus steps en el orden de `step_order`.
fn load_line(conn: &mut PgConnection, line_id: Uuid) -> Result<Option<Line>, PersistenceError> {
    let Some(row) = lines::table.find(line_id)
                                .select(LineRow::as_select())
                                .first::<LineRow>(conn)
                                .optional()?
    else {
        return Ok(None);
    };
    let step_rows: Vec<StepRow> = steps::table.filter(steps::line_id.eq(line_id))
                                              .select(StepRow::as_select())
                                              .load(conn)?;
    let worker_ids: Vec<Uuid> = step_rows.iter().filter_map(|s| s.worker_id).collect();
    let workers: HashMap<Uuid, Worker> = workers::table.filter(workers::id.eq_any(&worker_ids))
                                                       .select(WorkerRow::as_select())
                                                       .load::<WorkerRow>(conn)?
                                                       .into_iter()
                                                       .map(|w| w.into_worker().map(|w| (w.id, w)))
                                                       .collect::<Result<_, _>>()?;

    let mut by_id: HashMap<Uuid, StepRow> = step_rows.into_iter().map(|s| (s.id, s)).collect();
    let mut line = Line::new(row.name);
    line.id = row.id;
    line.input_headers = serde_json::from_value::<Vec<LineInputHeader>>(row.input_headers)?;
    for step_id in row.step_order {
        match by_id.remove(&step_id) {
            Some(step_row) => {
                line.append_step(step_row.into_step(&workers)?)?;
            }
            None => warn!("line {line_id} orders missing step {step_id}; skipped"),
        }
    }
    if !by_id.is_empty() {
        warn!("line {line_id} has {} steps outside step_order; ignored", by_id.len());
    }
    Ok(Some(line))
}

/// Arma el run con sus unidades en orden de inserción.
fn load_run(conn: &mut PgConnection, run_id: Uuid) -> Result<Option<Run>, PersistenceError> {
    let Some(run_row) = runs::table.find(run_id)
                                   .select(RunRow::as_select())
                                   .first::<RunRow>(conn)
                                   .optional()?
    else {
        return Ok(None);
    };
    let unit_rows: Vec<UnitRow> = units::table.filter(units::run_id.eq(run_id))
                                              .order(units::seq.asc())
                                              .select(UnitRow::as_select())
                                              .load(conn)?;
    let unit_ids: Vec<Uuid> = unit_rows.iter().map(|u| u.id).collect();
    let instance_rows: Vec<StepInstanceRow> = step_instances::table.filter(step_instances::unit_id.eq_any(&unit_ids))
                                                                   .select(StepInstanceRow::as_select())
                                                                   .load(conn)?;
    let mut grouped: HashMap<Uuid, Vec<StepInstance>> = HashMap::new();
    for row in instance_rows {
        let unit_id = row.unit_id;
        grouped.entry(unit_id).or_default().push(row.into_instance()?);
    }
    let units = unit_rows.into_iter()
                         .map(|u| {
                             let results: Vec<Record> = serde_json::from_value(u.results)?;
                             Ok(Unit::from_parts(u.id, grouped.remove(&u.id).unwrap_or_default(), results))
                         })
                         .collect::<Result<Vec<_>, PersistenceError>>()?;
    Ok(Some(Run::from_parts(run_row.id, run_row.line_id, run_row.created_at, units)))
}

/// Store Postgres de líneas y runs.
pub struct PgLineStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgLineStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn read<T, F>(&self, f: F) -> Result<T, PersistenceError>
        where F: Fn(&mut PgConnection) -> Result<T, PersistenceError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .repeatable_read()
                .read_only()
                .run(|tx| f(tx))
        })
    }

    fn write<T, F>(&self, f: F) -> Result<T, PersistenceError>
        where F: Fn(&mut PgConnection) -> Result<T, PersistenceError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction().read_write().run(|tx| f(tx))
        })
    }

    /// Inserta o actualiza la línea completa (orden, entradas, steps y
    /// workers) en una sola transacción.
    pub fn save_line(&self, line: &Line) -> Result<(), PersistenceError> {
        debug!("save_line:start line={} steps={}", line.id, line.step_count());
        let input_headers = serde_json::to_value(&line.input_headers)?;
        let step_order: Vec<Uuid> = line.ordered_steps().iter().map(|s| s.id).collect();
        self.write(|tx| {
                diesel::insert_into(lines::table).values(NewLineRow { id: line.id,
                                                                      name: &line.name,
                                                                      input_headers: input_headers.clone(),
                                                                      step_order: step_order.clone() })
                                                 .on_conflict(lines::id)
                                                 .do_update()
                                                 .set((lines::name.eq(excluded(lines::name)),
                                                       lines::input_headers.eq(excluded(lines::input_headers)),
                                                       lines::step_order.eq(excluded(lines::step_order))))
                                                 .execute(tx)?;
                for step in line.ordered_steps() {
                    upsert_step(tx, line.id, step)?;
                }
                Ok(())
            })
    }

    /// Inserta o actualiza el run, sus unidades y sus cadenas de instancias.
    /// Las unidades nuevas se agregan al final del orden de iteración.
    pub fn save_run(&self, run: &Run) -> Result<(), PersistenceError> {
        debug!("save_run:start run={} units={}", run.id, run.unit_count());
        self.write(|tx| {
                diesel::insert_into(runs::table).values(RunRow { id: run.id,
                                                                 line_id: run.line_id,
                                                                 created_at: run.created_at })
                                                .on_conflict(runs::id)
                                                .do_nothing()
                                                .execute(tx)?;
                for unit in run.units() {
                    let results = serde_json::to_value(unit.result_records())?;
                    diesel::insert_into(units::table).values(NewUnitRow { id: unit.id,
                                                                          run_id: run.id,
                                                                          results })
                                                     .on_conflict(units::id)
                                                     .do_update()
                                                     .set(units::results.eq(excluded(units::results)))
                                                     .execute(tx)?;
                    for instance in unit.step_instances() {
                        let row = StepInstanceRow::from_instance(unit.id, instance)?;
                        diesel::insert_into(step_instances::table).values(&row)
                                                                  .on_conflict(step_instances::id)
                                                                  .do_update()
                                                                  .set((step_instances::next_id.eq(excluded(step_instances::next_id)),
                                                                        step_instances::input_datas.eq(excluded(step_instances::input_datas))))
                                                                  .execute(tx)?;
                    }
                }
                Ok(())
            })
    }
}

impl<P: ConnectionProvider> LineRepository for PgLineStore<P> {
    fn find_line(&self, line_id: Uuid) -> Result<Line, CoreError> {
        debug!("find_line:start line={line_id}");
        let line = self.read(|tx| load_line(tx, line_id)).map_err(|e| {
                                                            error!("find_line error line={line_id} err={e:?}");
                                                            CoreError::from(e)
                                                        })?;
        line.ok_or(CoreError::LineNotFound(line_id))
    }

    fn save_step(&mut self, line_id: Uuid, step: &Step) -> Result<(), CoreError> {
        debug!("save_step:start line={line_id} step={}", step.id);
        let saved = self.write(|tx| {
                            let order: Option<Vec<Uuid>> = lines::table.find(line_id)
                                                                       .select(lines::step_order)
                                                                       .for_update()
                                                                       .first(tx)
                                                                       .optional()?;
                            let Some(mut order) = order else {
                                return Ok(false);
                            };
                            upsert_step(tx, line_id, step)?;
                            if !order.contains(&step.id) {
                                order.push(step.id);
                                diesel::update(lines::table.find(line_id)).set(lines::step_order.eq(order))
                                                                          .execute(tx)?;
                            }
                            Ok(true)
                        })
                        .map_err(|e| {
                            error!("save_step error line={line_id} step={} err={e:?}", step.id);
                            CoreError::from(e)
                        })?;
        if saved {
            Ok(())
        } else {
            Err(CoreError::LineNotFound(line_id))
        }
    }
}

impl<P: ConnectionProvider> RunRepository for PgLineStore<P> {
    fn find_run(&self, run_id: Uuid) -> Result<Run, CoreError> {
        debug!("find_run:start run={run_id}");
        let run = self.read(|tx| load_run(tx, run_id)).map_err(|e| {
                                                         error!("find_run error run={run_id} err={e:?}");
                                                         CoreError::from(e)
                                                     })?;
        let run = run.ok_or(CoreError::RunNotFound(run_id))?;
        debug!("find_run:done run={run_id} units={}", run.unit_count());
        Ok(run)
    }
}

/// Construye un pool Postgres r2d2 a partir de URL y corre las migraciones
/// pendientes. Si `min_size > max_size` se usa `min_size = max_size`.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), ajustando min=max",
              validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración y construye un pool
/// ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
