//! Contrato del `CheckpointStore` sobre Postgres; paridad con el backend en
//! memoria.


use deposit_core::store::{CheckpointStore, CheckpointUpdate, ExecutionUpdate, NewCheckpoint, NewExecutionRecord,
                          WorkflowRecord, WorkflowStatus};
use deposit_core::{StoreError, UserId};
use serde_json::json;
use test_support::{store, with_pool};
use uuid::Uuid;

fn seed(s: &mut impl CheckpointStore) -> Uuid {
    let uuid = Uuid::new_v4();
    s.save_workflow(&WorkflowRecord::new(uuid, "article", UserId(7), "webdeposit"))
     .expect("save workflow");
    uuid
}

/// Checkpoint y registro de ejecución iniciales; devuelve el id del registro.
fn seed_rows(s: &mut impl CheckpointStore, uuid: Uuid) -> i64 {
    s.create_checkpoint(new_checkpoint(uuid)).expect("checkpoint");
    s.create_execution_record(NewExecutionRecord { workflow_uuid: uuid,
                                                   task_counter: 0,
                                                   data: json!({}) })
     .expect("execution record")
     .id
}

fn finish(s: &mut impl CheckpointStore, uuid: Uuid, exec_id: i64) -> Result<i32, StoreError> {
    s.synchronize(uuid,
                  &CheckpointUpdate { current_step: 3,
                                      obj_json: json!({"user_id": 7, "break": true}),
                                      finish: true },
                  &ExecutionUpdate { id: exec_id,
                                     task_counter: 3,
                                     data: json!({"break": true}) })
}

fn new_checkpoint(uuid: Uuid) -> NewCheckpoint {
    NewCheckpoint { uuid,
                    user_id: UserId(7),
                    deposition_type: "article".into(),
                    current_step: 0,
                    obj_json: json!({"user_id": 7}) }
}

#[test]
fn one_checkpoint_per_workflow() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    with_pool(|pool| {
        let mut s = store(pool);
        let uuid = seed(&mut s);
        let cp = s.create_checkpoint(new_checkpoint(uuid)).expect("first checkpoint");
        assert_eq!(cp.status, WorkflowStatus::Running);
        let err = s.create_checkpoint(new_checkpoint(uuid)).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)), "got {err:?}");
        assert_eq!(s.find_checkpoint(uuid).unwrap().map(|c| c.id), Some(cp.id));
    });
}

#[test]
fn save_workflow_never_resets_counter() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    with_pool(|pool| {
        let mut s = store(pool);
        let uuid = seed(&mut s);
        let exec_id = seed_rows(&mut s, uuid);
        assert_eq!(finish(&mut s, uuid, exec_id).unwrap(), 1);
        assert_eq!(finish(&mut s, uuid, exec_id).unwrap(), 2);

        let mut record = s.find_workflow(uuid).unwrap().expect("workflow");
        record.counter_finished = 0;
        record.name = "thesis".into();
        s.save_workflow(&record).unwrap();

        let stored = s.find_workflow(uuid).unwrap().expect("workflow");
        assert_eq!(stored.counter_finished, 2);
        assert_eq!(stored.name, "thesis");
    });
}

#[test]
fn finishing_write_bumps_counter_with_checkpoint() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    with_pool(|pool| {
        let mut s = store(pool);
        let uuid = seed(&mut s);
        let exec_id = seed_rows(&mut s, uuid);
        assert_eq!(finish(&mut s, uuid, exec_id).unwrap(), 1);

        let cp = s.find_checkpoint(uuid).unwrap().expect("checkpoint");
        assert_eq!(cp.status, WorkflowStatus::Finished);
        assert_eq!(cp.obj_json, json!({"user_id": 7, "break": true}));
        assert_eq!(s.find_workflow(uuid).unwrap().expect("workflow").counter_finished, 1);
    });
}

#[test]
fn synchronize_writes_both_rows() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    with_pool(|pool| {
        let mut s = store(pool);
        let uuid = seed(&mut s);
        s.create_checkpoint(new_checkpoint(uuid)).unwrap();
        let rec = s.create_execution_record(NewExecutionRecord { workflow_uuid: uuid,
                                                                 task_counter: 0,
                                                                 data: json!({}) })
                   .unwrap();

        let blob = json!({"user_id": 7, "title": "Tides"});
        let counter = s.synchronize(uuid,
                                    &CheckpointUpdate { current_step: 2,
                                                        obj_json: blob.clone(),
                                                        finish: false },
                                    &ExecutionUpdate { id: rec.id,
                                                       task_counter: 2,
                                                       data: blob.clone() })
                       .unwrap();
        assert_eq!(counter, 0);

        let cp = s.find_checkpoint(uuid).unwrap().expect("checkpoint");
        assert_eq!(cp.current_step, 2);
        assert_eq!(cp.obj_json, blob);
        let records = s.list_execution_records(uuid).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task_counter, 2);
        assert_eq!(records[0].data, blob);
    });
}

#[test]
fn synchronize_rolls_back_when_execution_record_is_missing() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    with_pool(|pool| {
        let mut s = store(pool);
        let uuid = seed(&mut s);
        s.create_checkpoint(new_checkpoint(uuid)).unwrap();

        assert_eq!(finish(&mut s, uuid, -1), Err(StoreError::NotFound));
        // El incremento del contador se revierte junto con el resto.
        assert_eq!(s.find_workflow(uuid).unwrap().expect("workflow").counter_finished, 0);

        let cp = s.find_checkpoint(uuid).unwrap().expect("checkpoint");
        assert_eq!(cp.current_step, 0);
        assert_eq!(cp.status, WorkflowStatus::Running);
        assert_eq!(cp.obj_json, json!({"user_id": 7}));
    });
}

#[test]
fn checkpoint_for_unknown_workflow_is_rejected() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    with_pool(|pool| {
        let mut s = store(pool);
        let err = s.create_checkpoint(new_checkpoint(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, StoreError::Unknown(ref m) if m.contains("foreign key")), "got {err:?}");
    });
}
