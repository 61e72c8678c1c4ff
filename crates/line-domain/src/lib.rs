// line-domain library entry point
pub mod error;
pub mod instruction;
pub mod line;
pub mod run;
pub mod step;
pub use error::DomainError;
pub use instruction::{FieldType, FormField, Instruction};
pub use line::{Line, LineInputHeader};
pub use run::{Record, Run, StepInstance, Unit};
pub use step::{Step, StepKind, Worker};
