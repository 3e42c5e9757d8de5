//! Operaciones de mantenimiento sobre un workflow ya persistido.
//!
//! La CLI no conoce el registro de pasos de cada tipo de depósito, así que
//! trabaja directamente contra el `CheckpointStore`: lee el checkpoint y el
//! registro de ejecución más reciente y, para mover el cursor, reescribe
//! ambos con `synchronize`.

use deposit_core::store::{latest_execution_record, Checkpoint, CheckpointStore, CheckpointUpdate, ExecutionRecord,
                          ExecutionUpdate, WorkflowRecord, WorkflowStatus};
use deposit_core::StoreError;
use log::info;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no encontrado: {0}")]
    NotFound(String),
    #[error("rechazado: {0}")]
    Rejected(String),
    #[error("backend: {0}")]
    Backend(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound(_) | CliError::Rejected(_) => 4,
            CliError::Backend(_) => 5,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CliError::NotFound("registro inexistente".into()),
            other => CliError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub uuid: Uuid,
    pub deposition_type: String,
    pub user_id: i64,
    pub status: WorkflowStatus,
    pub counter_finished: i32,
    pub current_step: usize,
}

fn load<S: CheckpointStore>(store: &S, uuid: Uuid) -> Result<(WorkflowRecord, Checkpoint), CliError> {
    let workflow = store.find_workflow(uuid)?
                        .ok_or_else(|| CliError::NotFound(format!("workflow {uuid}")))?;
    let checkpoint = store.find_checkpoint(uuid)?
                          .ok_or_else(|| CliError::NotFound(format!("checkpoint de {uuid}")))?;
    Ok((workflow, checkpoint))
}

fn latest<S: CheckpointStore>(store: &S, uuid: Uuid) -> Result<ExecutionRecord, CliError> {
    let records = store.list_execution_records(uuid)?;
    latest_execution_record(&records).cloned()
                                     .ok_or_else(|| CliError::NotFound(format!("registro de ejecución de {uuid}")))
}

pub fn status<S: CheckpointStore>(store: &S, uuid: Uuid) -> Result<StatusReport, CliError> {
    let (workflow, checkpoint) = load(store, uuid)?;
    Ok(StatusReport { uuid,
                      deposition_type: workflow.name,
                      user_id: workflow.user_id.0,
                      status: WorkflowStatus::from_counter(workflow.counter_finished),
                      counter_finished: workflow.counter_finished,
                      current_step: checkpoint.current_step })
}

/// Vista completa: workflow, checkpoint y registro de ejecución vigente.
pub fn show<S: CheckpointStore>(store: &S, uuid: Uuid) -> Result<Value, CliError> {
    let (workflow, checkpoint) = load(store, uuid)?;
    let execution = latest(store, uuid)?;
    Ok(json!({
        "workflow": workflow,
        "checkpoint": checkpoint,
        "execution": execution,
    }))
}

fn move_cursor<S: CheckpointStore>(store: &mut S, uuid: Uuid, step: usize) -> Result<(), CliError> {
    let (_, checkpoint) = load(store, uuid)?;
    let execution = latest(store, uuid)?;
    let update = CheckpointUpdate { current_step: step,
                                    obj_json: checkpoint.obj_json.clone(),
                                    finish: false };
    let exec = ExecutionUpdate { id: execution.id,
                                 task_counter: step,
                                 data: execution.data };
    store.synchronize(uuid, &update, &exec)?;
    info!("move_cursor: uuid={uuid} {} -> {step}", checkpoint.current_step);
    Ok(())
}

/// Retrocede un paso, nunca por debajo de 1. Devuelve el nuevo cursor.
pub fn rewind<S: CheckpointStore>(store: &mut S, uuid: Uuid) -> Result<usize, CliError> {
    let (_, checkpoint) = load(store, uuid)?;
    let step = checkpoint.current_step.saturating_sub(1).max(1);
    move_cursor(store, uuid, step)?;
    Ok(step)
}

/// Fija el cursor; `steps` es el tamaño del registro del tipo de depósito.
pub fn set_step<S: CheckpointStore>(store: &mut S, uuid: Uuid, step: usize, steps: usize) -> Result<(), CliError> {
    if step > steps {
        return Err(CliError::Rejected(format!("step {step} fuera de rango (steps={steps})")));
    }
    move_cursor(store, uuid, step)
}
