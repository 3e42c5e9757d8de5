//! Errores del controlador y del contrato de almacenamiento.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errores que un `CheckpointStore` puede devolver.
///
/// Es la vista neutral del core; los backends concretos (p.ej. Postgres)
/// traducen sus propios errores a estas variantes.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum StoreError {
    #[error("record not found")] NotFound,
    #[error("unique violation: {0}")] UniqueViolation(String),
    #[error("serialization conflict (retryable)")] SerializationConflict,
    #[error("transient IO / connection error: {0}")] TransientIo(String),
    #[error("value out of range: {0}")] OutOfRange(String),
    #[error("store error: {0}")] Unknown(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DepositError {
    /// No hay actor explícito ni actor ambiental autenticado.
    #[error("actor id could not be resolved")] IdentityUnresolved,
    #[error("no execution record for workflow {0}")] MissingExecutionRecord(Uuid),
    #[error("no workflow record for {0}")] MissingWorkflowRecord(Uuid),
    /// `uuid` explícito y handle provisto nombran workflows distintos.
    #[error("handle {handle} does not match workflow {uuid}")] HandleMismatch { uuid: Uuid, handle: Uuid },
    #[error("invalid step index {step} (steps_num={steps_num})")] InvalidStepIndex { step: usize, steps_num: usize },
    #[error("step {index} ({step_id}) failed: {message}")] StepFailed { index: usize, step_id: String, message: String },
    #[error(transparent)] Store(#[from] StoreError),
}

impl DepositError {
    /// `true` si reintentar la misma operación tiene sentido.
    pub fn is_retryable(&self) -> bool {
        matches!(self,
                 DepositError::StepFailed { .. }
                 | DepositError::Store(StoreError::SerializationConflict)
                 | DepositError::Store(StoreError::TransientIo(_)))
    }
}
