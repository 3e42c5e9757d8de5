//! Proyección de solo lectura del estado del workflow para renderizado.

use serde_json::Value;
use uuid::Uuid;

use crate::engine::ExecutionEngine;
use crate::forms::DepositionForm;
use crate::store::CheckpointStore;

use super::DepositionWorkflow;

pub struct WorkflowOutput<'a, S: CheckpointStore, X: ExecutionEngine> {
    pub workflow: &'a DepositionWorkflow<S, X>,
    pub deposition_type: String,
    /// Formulario del paso vigente, si lo tiene.
    pub form: Option<Box<dyn DepositionForm>>,
    pub drafts: Value,
    pub uuid: Uuid,
    /// `Some` sólo si se pidió validación y hay formulario.
    pub valid: Option<bool>,
}

impl<S: CheckpointStore, X: ExecutionEngine> WorkflowOutput<'_, S, X> {
    pub fn form_errors(&self) -> &[String] {
        self.form.as_ref().map(|f| f.errors()).unwrap_or(&[])
    }
}
