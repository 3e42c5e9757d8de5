//! Pasos de un workflow de depósito.
//!
//! Un paso es una unidad opaca que muta el `WorkflowContext` compartido y,
//! opcionalmente, usa el `StepControl` para consultar su posición o pedir un
//! salto. Este módulo define:
//! - `DepositionStep`: interfaz neutral usada por el controlador.
//! - `StepRunResult`: éxito, pausa explícita o fallo.
//! - `StepControl`: canal de vuelta hacia el controlador.
//! - `FnStep` / `step_fn`: adaptador para closures.

pub mod control;
pub mod definition;
pub mod fn_step;
mod run_result;

pub use control::StepControl;
pub use definition::DepositionStep;
pub use fn_step::{step_fn, FnStep};
pub use run_result::StepRunResult;
