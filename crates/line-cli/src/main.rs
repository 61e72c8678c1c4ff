//! `lineflow`: consultas sobre líneas y runs desde la terminal.
//!
//! Con `--fixture FILE` trabaja sobre un documento JSON en memoria; si no,
//! usa Postgres (`DATABASE_URL`). La salida es JSON en stdout.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use line_core::{CoreError, Fixture, InMemoryStore, LineRepository, LineService, RunRepository, StepChain};
use line_domain::{Step, StepKind};
use line_persistence::{PgLineStore, PoolProvider};
use log::{debug, error};
use serde_json::{json, Value};
use uuid::Uuid;

const EXIT_ERROR: u8 = 1;
const EXIT_NOT_FOUND: u8 = 4;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "lineflow", version, about = "Inspecciona líneas, steps y runs")]
struct Cli {
    /// Documento JSON con líneas y runs; sin él se usa Postgres.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct Target {
    #[arg(long)]
    line: Uuid,
    #[arg(long)]
    step: Uuid,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg {
    Work,
    Review,
}

impl From<KindArg> for StepKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Work => StepKind::Work,
            KindArg::Review => StepKind::Review,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step anterior, último Work y posición.
    Chain {
        #[command(flatten)]
        target: Target,
    },
    /// Encabezados de entrada y salida.
    Headers {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        with_values: bool,
    },
    /// Tabla de resultados (sólo encabezado sin `--run`).
    Results {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        run: Option<Uuid>,
    },
    /// Porcentaje de unidades que llegaron al step.
    Progress {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        run: Uuid,
    },
    /// Si el step tiene worker e instrucción completa.
    Complete {
        #[command(flatten)]
        target: Target,
    },
    /// Tipos admitidos; sin `--step` se evalúa un step nuevo al final.
    Kinds {
        #[arg(long)]
        line: Uuid,
        #[arg(long)]
        step: Option<Uuid>,
    },
    /// Origen de los datos de precarga.
    Source {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        run: Option<Uuid>,
    },
    /// Copia la instrucción del anterior; sin `--step` crea un borrador.
    Prefill {
        #[arg(long)]
        line: Uuid,
        #[arg(long)]
        step: Option<Uuid>,
        #[arg(long, value_enum, default_value = "review")]
        kind: KindArg,
    },
}

fn dispatch<S: LineRepository + RunRepository>(svc: &mut LineService<S>, command: Command) -> Result<Value, CoreError> {
    debug!("dispatch {command:?}");
    let out = match command {
        Command::Chain { target: Target { line, step } } => {
            let snapshot = svc.store().find_line(line)?;
            let current = snapshot.step(step).ok_or(CoreError::StepNotFound(step))?;
            let chain = StepChain::new(&snapshot);
            json!({
                "position": chain.position(current),
                "previous_step": chain.previous_step(current),
                "last_work_step": chain.last_work_step(current),
            })
        }
        Command::Headers { target: Target { line, step }, with_values } => json!({
            "input_headers": svc.input_headers(line, step, with_values)?,
            "output_headers": svc.output_headers(line, step)?,
        }),
        Command::Results { target: Target { line, step }, run } => to_json(&svc.get_results(line, step, run)?)?,
        Command::Progress { target: Target { line, step }, run } => json!({ "progress": svc.progress(line, step, run)? }),
        Command::Complete { target: Target { line, step } } => json!({
            "complete": svc.is_complete(line, step)?,
            "has_worker": svc.has_worker(line, step)?,
        }),
        Command::Kinds { line, step } => {
            let kinds = match step {
                Some(step) => svc.allowed_kinds(line, step)?,
                None => svc.allowed_kinds_for_new(line)?,
            };
            json!({ "kinds": kinds })
        }
        Command::Source { target: Target { line, step }, run } => {
            let source = svc.result_source(line, step, run)?;
            json!({ "load_data": source.load_data(), "data": source })
        }
        Command::Prefill { line, step, kind } => {
            let draft = match step {
                Some(id) => svc.store().find_line(line)?.step(id).cloned().ok_or(CoreError::StepNotFound(id))?,
                None => Step::new(kind.into()),
            };
            to_json(&svc.prefill_step(line, draft, kind.into())?)?
        }
    };
    Ok(out)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(|e| CoreError::Store(format!("json: {e}")))
}

fn run(cli: Cli) -> Result<Value, CoreError> {
    match cli.fixture {
        Some(path) => {
            let store = InMemoryStore::from_fixture(Fixture::from_path(&path)?)?;
            dispatch(&mut LineService::new(store), cli.command)
        }
        None => {
            let pool = line_persistence::build_dev_pool_from_env().map_err(CoreError::from)?;
            let store = PgLineStore::new(PoolProvider { pool });
            dispatch(&mut LineService::new(store), cli.command)
        }
    }
}

/// Logger con filtro de `env` o, si no está definido, `info`.
fn logger(env: env_logger::Env<'_>) -> env_logger::Builder {
    env_logger::Builder::from_env(env.default_filter_or(DEFAULT_LOG_FILTER))
}

fn main() -> ExitCode {
    line_persistence::init_dotenv();
    logger(env_logger::Env::default()).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("no se pudo serializar la salida: {e}");
                ExitCode::from(EXIT_ERROR)
            }
        },
        Err(e) => {
            eprintln!("[lineflow] {e}");
            if e.is_not_found() {
                ExitCode::from(EXIT_NOT_FOUND)
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
    }
}
