use crate::context::WorkflowContext;

use super::{StepControl, StepRunResult};

/// Trait que define un paso. Las implementaciones deben tolerar ser
/// re-ejecutadas: un fallo no avanza el cursor y el reintento vuelve a
/// invocar el mismo paso.
pub trait DepositionStep {
    /// Identificador estable dentro del registro.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str {
        self.id()
    }

    fn run(&self, ctx: &mut WorkflowContext, control: &mut StepControl) -> StepRunResult;
}
