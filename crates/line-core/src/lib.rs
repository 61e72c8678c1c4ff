//! line-core: resolución de la cadena de steps y agregación de resultados.
pub mod chain;
pub mod constants;
pub mod errors;
pub mod gate;
pub mod headers;
pub mod prefill;
pub mod progress;
pub mod repo;
pub mod results;
pub mod service;
pub mod source;

pub use chain::StepChain;
pub use errors::CoreError;
pub use gate::allowed_kinds;
pub use headers::{HeaderDeriver, InputHeader};
pub use prefill::prefill_from_previous;
pub use progress::progress;
pub use repo::{Fixture, InMemoryStore, LineRepository, RunRepository};
pub use results::{ResultAggregator, ResultTable};
pub use service::LineService;
pub use source::{result_source, ResultSource};
