//! Contrato del almacén de checkpoints y backend en memoria.

mod memory;
mod types;

pub use memory::InMemoryCheckpointStore;
pub use types::{latest_execution_record, Checkpoint, CheckpointUpdate, ExecutionRecord, ExecutionUpdate, NewCheckpoint,
                NewExecutionRecord, WorkflowRecord, WorkflowStatus};

use uuid::Uuid;

use crate::errors::StoreError;

/// Almacenamiento durable de workflows, checkpoints y registros de
/// ejecución.
///
/// Contrato:
/// - Un único checkpoint por `uuid`; `create_checkpoint` sobre un uuid ya
///   existente es un error (`UniqueViolation`).
/// - `synchronize` escribe checkpoint y registro de ejecución en UNA
///   transacción; o se aplican ambos o ninguno. El incremento de
///   `counter_finished` de la transición terminal va en esa misma
///   transacción, nunca por separado.
/// - Los errores no se recuperan aquí: suben al controlador.
pub trait CheckpointStore {
    /// Inserta o actualiza el registro del workflow (el "handle" del motor).
    /// `counter_finished` nunca se sobrescribe por esta vía.
    fn save_workflow(&mut self, record: &WorkflowRecord) -> Result<(), StoreError>;

    fn find_workflow(&self, uuid: Uuid) -> Result<Option<WorkflowRecord>, StoreError>;

    fn find_checkpoint(&self, uuid: Uuid) -> Result<Option<Checkpoint>, StoreError>;

    fn create_checkpoint(&mut self, new: NewCheckpoint) -> Result<Checkpoint, StoreError>;

    fn create_execution_record(&mut self, new: NewExecutionRecord) -> Result<ExecutionRecord, StoreError>;

    /// Todos los registros de ejecución del workflow, sin orden garantizado.
    fn list_execution_records(&self, uuid: Uuid) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Devuelve `counter_finished` tal como quedó tras la escritura. El
    /// estado del checkpoint se deriva de ese valor.
    fn synchronize(&mut self,
                   uuid: Uuid,
                   checkpoint: &CheckpointUpdate,
                   execution: &ExecutionUpdate)
                   -> Result<i32, StoreError>;
}
