use log::debug;

use super::ExecutionEngine;
use crate::context::WorkflowContext;
use crate::step::{DepositionStep, StepControl, StepRunResult};

/// Invoca el paso en el hilo actual y cuenta invocaciones.
#[derive(Debug, Default)]
pub struct DirectEngine {
    invocations: u64,
}

impl DirectEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl ExecutionEngine for DirectEngine {
    fn invoke(&mut self,
              index: usize,
              step: &dyn DepositionStep,
              ctx: &mut WorkflowContext,
              control: &mut StepControl)
              -> StepRunResult {
        self.invocations += 1;
        debug!("invoke:start uuid={} index={index} step_id={}", control.uuid(), step.id());
        let result = step.run(ctx, control);
        debug!("invoke:done uuid={} index={index} result={:?}", control.uuid(), result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;
    use crate::step::step_fn;
    use uuid::Uuid;

    #[test]
    fn invoke_runs_step_against_context() {
        let mut engine = DirectEngine::new();
        let step = step_fn("title", |ctx, _| {
            ctx.insert("title", "Draft");
            StepRunResult::Success
        });
        let mut ctx = WorkflowContext::new(UserId(1), "article");
        let mut control = StepControl::new(Uuid::new_v4(), UserId(1), 0, 1);
        let res = engine.invoke(0, &step, &mut ctx, &mut control);
        assert_eq!(res, StepRunResult::Success);
        assert_eq!(ctx.get("title"), Some(&serde_json::json!("Draft")));
        assert_eq!(engine.invocations(), 1);
    }
}
