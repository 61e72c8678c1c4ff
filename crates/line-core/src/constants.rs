//! Constantes del core.

/// Valor de una entrada que sólo se conoce al ejecutar (la produce el step
/// anterior).
pub const PREVIOUS_RESULT_SENTINEL: &str = "result from previous step";

/// Número de worker más alto con reglas propias; los mayores usan su fila.
pub const MAX_GATED_WORKER_NUMBER: u32 = 2;

/// Decimales con los que se redondea el progreso.
pub const PROGRESS_DECIMALS: i32 = 2;
