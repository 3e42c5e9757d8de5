//! Backend en memoria de `CheckpointStore` (tests, demos, procesos efímeros).

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::types::{Checkpoint, CheckpointUpdate, ExecutionRecord, ExecutionUpdate, NewCheckpoint, NewExecutionRecord,
                   WorkflowRecord, WorkflowStatus};
use super::CheckpointStore;
use crate::errors::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    workflows: HashMap<Uuid, WorkflowRecord>,
    checkpoints: HashMap<Uuid, Checkpoint>,
    executions: Vec<ExecutionRecord>,
    next_checkpoint_id: i64,
    next_execution_id: i64,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta un registro de ejecución tal cual (timestamps incluidos).
    /// Útil para importar intentos de otro proceso.
    pub fn put_execution_record(&mut self, record: ExecutionRecord) {
        self.next_execution_id = self.next_execution_id.max(record.id);
        self.executions.retain(|r| r.id != record.id);
        self.executions.push(record);
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn execution_record_count(&self, uuid: Uuid) -> usize {
        self.executions.iter().filter(|r| r.workflow_uuid == uuid).count()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save_workflow(&mut self, record: &WorkflowRecord) -> Result<(), StoreError> {
        let now = Utc::now();
        match self.workflows.get_mut(&record.uuid) {
            Some(existing) => {
                existing.name = record.name.clone();
                existing.user_id = record.user_id;
                existing.module_name = record.module_name.clone();
                existing.definition_hash = record.definition_hash.clone();
                existing.modified = now;
            }
            None => {
                let mut stored = record.clone();
                stored.modified = now;
                self.workflows.insert(record.uuid, stored);
            }
        }
        Ok(())
    }

    fn find_workflow(&self, uuid: Uuid) -> Result<Option<WorkflowRecord>, StoreError> {
        Ok(self.workflows.get(&uuid).cloned())
    }

    fn find_checkpoint(&self, uuid: Uuid) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.checkpoints.get(&uuid).cloned())
    }

    fn create_checkpoint(&mut self, new: NewCheckpoint) -> Result<Checkpoint, StoreError> {
        if self.checkpoints.contains_key(&new.uuid) {
            return Err(StoreError::UniqueViolation(format!("checkpoint for {} already exists", new.uuid)));
        }
        let status = self.workflows
                         .get(&new.uuid)
                         .map(|w| WorkflowStatus::from_counter(w.counter_finished))
                         .unwrap_or(WorkflowStatus::Running);
        self.next_checkpoint_id += 1;
        let cp = Checkpoint { id: self.next_checkpoint_id,
                              uuid: new.uuid,
                              user_id: new.user_id,
                              deposition_type: new.deposition_type,
                              status,
                              current_step: new.current_step,
                              obj_json: new.obj_json,
                              modified: Utc::now() };
        self.checkpoints.insert(cp.uuid, cp.clone());
        Ok(cp)
    }

    fn create_execution_record(&mut self, new: NewExecutionRecord) -> Result<ExecutionRecord, StoreError> {
        self.next_execution_id += 1;
        let rec = ExecutionRecord { id: self.next_execution_id,
                                    workflow_uuid: new.workflow_uuid,
                                    task_counter: new.task_counter,
                                    data: new.data,
                                    modified: Utc::now() };
        self.executions.push(rec.clone());
        Ok(rec)
    }

    fn list_execution_records(&self, uuid: Uuid) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self.executions.iter().filter(|r| r.workflow_uuid == uuid).cloned().collect())
    }

    fn synchronize(&mut self,
                   uuid: Uuid,
                   checkpoint: &CheckpointUpdate,
                   execution: &ExecutionUpdate)
                   -> Result<i32, StoreError> {
        // Validar las tres filas antes de escribir: todo o nada.
        if !self.checkpoints.contains_key(&uuid) {
            return Err(StoreError::NotFound);
        }
        let exec_pos = self.executions
                           .iter()
                           .position(|r| r.id == execution.id && r.workflow_uuid == uuid)
                           .ok_or(StoreError::NotFound)?;
        let workflow = self.workflows.get_mut(&uuid).ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        if checkpoint.finish {
            workflow.counter_finished += 1;
            workflow.modified = now;
        }
        let counter = workflow.counter_finished;
        if let Some(cp) = self.checkpoints.get_mut(&uuid) {
            cp.status = WorkflowStatus::from_counter(counter);
            cp.current_step = checkpoint.current_step;
            cp.obj_json = checkpoint.obj_json.clone();
            cp.modified = now;
        }
        let rec = &mut self.executions[exec_pos];
        rec.task_counter = execution.task_counter;
        rec.data = execution.data.clone();
        rec.modified = now;
        Ok(counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;
    use serde_json::json;

    fn new_checkpoint(uuid: Uuid) -> NewCheckpoint {
        NewCheckpoint { uuid,
                        user_id: UserId(1),
                        deposition_type: "article".into(),
                        current_step: 0,
                        obj_json: json!({"user_id": 1}) }
    }

    /// Workflow, checkpoint y registro de ejecución listos para `synchronize`.
    fn seeded() -> (InMemoryCheckpointStore, Uuid, i64) {
        let mut store = InMemoryCheckpointStore::new();
        let uuid = Uuid::new_v4();
        store.save_workflow(&WorkflowRecord::new(uuid, "article", UserId(1), "webdeposit"))
             .unwrap();
        store.create_checkpoint(new_checkpoint(uuid)).unwrap();
        let rec = store.create_execution_record(NewExecutionRecord { workflow_uuid: uuid,
                                                                     task_counter: 0,
                                                                     data: json!({}) })
                       .unwrap();
        (store, uuid, rec.id)
    }

    fn update(step: usize, finish: bool) -> CheckpointUpdate {
        CheckpointUpdate { current_step: step,
                           obj_json: json!({"user_id": 1, "title": "x"}),
                           finish }
    }

    fn exec(id: i64, step: usize) -> ExecutionUpdate {
        ExecutionUpdate { id,
                          task_counter: step,
                          data: json!({"title": "x"}) }
    }

    #[test]
    fn second_checkpoint_for_same_uuid_is_rejected() {
        let mut store = InMemoryCheckpointStore::new();
        let uuid = Uuid::new_v4();
        store.create_checkpoint(new_checkpoint(uuid)).unwrap();
        let err = store.create_checkpoint(new_checkpoint(uuid)).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(store.checkpoint_count(), 1);
    }

    #[test]
    fn save_workflow_keeps_finished_counter() {
        let (mut store, uuid, exec_id) = seeded();
        assert_eq!(store.synchronize(uuid, &update(3, true), &exec(exec_id, 3)).unwrap(), 1);
        let rec = WorkflowRecord::new(uuid, "article", UserId(1), "webdeposit");
        store.save_workflow(&rec).unwrap();
        assert_eq!(store.find_workflow(uuid).unwrap().unwrap().counter_finished, 1);
    }

    #[test]
    fn synchronize_on_unknown_workflow_fails() {
        let mut store = InMemoryCheckpointStore::new();
        let uuid = Uuid::new_v4();
        store.create_checkpoint(new_checkpoint(uuid)).unwrap();
        let rec = store.create_execution_record(NewExecutionRecord { workflow_uuid: uuid,
                                                                     task_counter: 0,
                                                                     data: json!({}) })
                       .unwrap();
        assert_eq!(store.synchronize(uuid, &update(1, true), &exec(rec.id, 1)),
                   Err(StoreError::NotFound));
        assert_eq!(store.find_checkpoint(uuid).unwrap().unwrap().current_step, 0);
    }

    #[test]
    fn synchronize_is_all_or_nothing() {
        let (mut store, uuid, exec_id) = seeded();
        assert_eq!(store.synchronize(uuid, &update(2, true), &exec(99, 2)), Err(StoreError::NotFound));
        assert_eq!(store.find_checkpoint(uuid).unwrap().unwrap().current_step, 0);
        assert_eq!(store.find_workflow(uuid).unwrap().unwrap().counter_finished, 0);

        assert_eq!(store.synchronize(uuid, &update(2, false), &exec(exec_id, 2)).unwrap(), 0);
        let cp = store.find_checkpoint(uuid).unwrap().unwrap();
        assert_eq!(cp.current_step, 2);
        assert_eq!(cp.status, WorkflowStatus::Running);
        assert_eq!(store.list_execution_records(uuid).unwrap()[0].task_counter, 2);
    }

    #[test]
    fn finishing_write_bumps_counter_and_status_together() {
        let (mut store, uuid, exec_id) = seeded();
        assert_eq!(store.synchronize(uuid, &update(3, true), &exec(exec_id, 3)).unwrap(), 1);
        assert_eq!(store.find_checkpoint(uuid).unwrap().unwrap().status, WorkflowStatus::Finished);
        // Una escritura normal conserva el contador.
        assert_eq!(store.synchronize(uuid, &update(0, false), &exec(exec_id, 0)).unwrap(), 1);
        assert_eq!(store.find_checkpoint(uuid).unwrap().unwrap().status, WorkflowStatus::Finished);
    }
}
