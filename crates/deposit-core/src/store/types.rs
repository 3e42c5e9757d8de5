//! Filas persistidas: workflow, checkpoint y registros de ejecución.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::identity::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Finished,
}

impl WorkflowStatus {
    /// `Finished` si el workflow se recorrió completo al menos una vez.
    pub fn from_counter(counter_finished: i32) -> Self {
        if counter_finished >= 1 {
            Self::Finished
        } else {
            Self::Running
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            other => Err(StoreError::Unknown(format!("unknown workflow status '{other}'"))),
        }
    }
}

/// Registro dueño del workflow (handle del motor de ejecución).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub uuid: Uuid,
    /// Tipo de depósito.
    pub name: String,
    pub user_id: UserId,
    pub module_name: String,
    pub counter_finished: i32,
    pub definition_hash: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl WorkflowRecord {
    pub fn new(uuid: Uuid, name: &str, user_id: UserId, module_name: &str) -> Self {
        let now = Utc::now();
        Self { uuid,
               name: name.to_string(),
               user_id,
               module_name: module_name.to_string(),
               counter_finished: 0,
               definition_hash: None,
               created: now,
               modified: now }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: UserId,
    pub deposition_type: String,
    pub status: WorkflowStatus,
    pub current_step: usize,
    pub obj_json: Value,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCheckpoint {
    pub uuid: Uuid,
    pub user_id: UserId,
    pub deposition_type: String,
    pub current_step: usize,
    pub obj_json: Value,
}

/// Escritura del checkpoint. El estado no viaja aquí: el almacén lo deriva
/// del contador de finalización dentro de la misma transacción.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointUpdate {
    pub current_step: usize,
    pub obj_json: Value,
    /// Transición terminal: incrementa `counter_finished` junto con la
    /// escritura.
    pub finish: bool,
}

/// Intento/reanudación concreta de un workflow. Puede haber varios por uuid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub workflow_uuid: Uuid,
    pub task_counter: usize,
    pub data: Value,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExecutionRecord {
    pub workflow_uuid: Uuid,
    pub task_counter: usize,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionUpdate {
    pub id: i64,
    pub task_counter: usize,
    pub data: Value,
}

/// Registro modificado más recientemente (empates: id mayor). Es el punto de
/// reanudación del workflow.
pub fn latest_execution_record(records: &[ExecutionRecord]) -> Option<&ExecutionRecord> {
    records.iter().max_by_key(|r| (r.modified, r.id))
}
