//! Adaptador de closures a `DepositionStep`.

use std::fmt;

use crate::context::WorkflowContext;

use super::{DepositionStep, StepControl, StepRunResult};

pub struct FnStep<F> {
    id: String,
    f: F,
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("id", &self.id).finish()
    }
}

impl<F> DepositionStep for FnStep<F>
    where F: Fn(&mut WorkflowContext, &mut StepControl) -> StepRunResult
{
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, ctx: &mut WorkflowContext, control: &mut StepControl) -> StepRunResult {
        (self.f)(ctx, control)
    }
}

/// Envuelve un callable opaco como paso del registro.
///
/// ```ignore
/// let s = step_fn("title", |ctx, _| {
///     ctx.insert("title", "Untitled");
///     StepRunResult::Success
/// });
/// ```
pub fn step_fn<F>(id: impl Into<String>, f: F) -> FnStep<F>
    where F: Fn(&mut WorkflowContext, &mut StepControl) -> StepRunResult
{
    FnStep { id: id.into(), f }
}
