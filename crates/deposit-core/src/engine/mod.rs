//! Motor de ejecución: servicio puro de invocación de pasos.
//!
//! El motor no tiene noción propia de "paso actual"; el cursor vive en el
//! controlador (`DepositionWorkflow`).

mod direct;

pub use direct::DirectEngine;

use crate::context::WorkflowContext;
use crate::step::{DepositionStep, StepControl, StepRunResult};

pub trait ExecutionEngine {
    /// Ejecuta `step` (posición `index`) contra el contexto compartido.
    fn invoke(&mut self,
              index: usize,
              step: &dyn DepositionStep,
              ctx: &mut WorkflowContext,
              control: &mut StepControl)
              -> StepRunResult;
}
