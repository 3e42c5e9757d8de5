//! Implementación Postgres (Diesel) del `CheckpointStore` del core.
//!
//! Objetivo general del módulo:
//! - Paridad 1:1 con `InMemoryCheckpointStore`: un checkpoint por uuid,
//!   contador de finalización que sólo crece y `synchronize` atómico.
//! - Aislar el mapeo filas de DB ↔ tipos del core.
//!
//! Todas las operaciones pasan por `with_retry`, que repite la unidad de
//! trabajo ante conflictos de serialización o fallos transitorios de
//! conexión. Las escrituras de varias filas corren en una transacción
//! `read_write` para que un reintento nunca deje estado a medias.
//!
//! La escritura terminal (`finish`) incrementa `counter_finished`, que no es
//! idempotente: sólo se repite cuando Postgres garantiza que la transacción
//! no se confirmó (`is_rolled_back`).

use chrono::{DateTime, Utc};
use deposit_core::store::{Checkpoint, CheckpointStore, CheckpointUpdate, ExecutionRecord, ExecutionUpdate, NewCheckpoint,
                          NewExecutionRecord, WorkflowRecord, WorkflowStatus};
use deposit_core::{StoreError, UserId};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::result::Error as DieselError;
use log::{debug, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{deposit_checkpoints, deposit_execution_records, deposit_workflows};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Al construirlo con `build_pool` se corren las migraciones pendientes una
/// sola vez.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o uno de pruebas sin acoplar el store a
/// r2d2. Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila de `deposit_workflows`.
#[derive(Queryable, Debug)]
pub struct WorkflowRow {
    pub workflow_uuid: Uuid,
    pub name: String,
    pub user_id: i64,
    pub module_name: String,
    pub counter_finished: i32,
    pub definition_hash: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<WorkflowRow> for WorkflowRecord {
    fn from(row: WorkflowRow) -> Self {
        WorkflowRecord { uuid: row.workflow_uuid,
                         name: row.name,
                         user_id: UserId(row.user_id),
                         module_name: row.module_name,
                         counter_finished: row.counter_finished,
                         definition_hash: row.definition_hash,
                         created: row.created,
                         modified: row.modified }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = deposit_workflows)]
pub struct NewWorkflowRow<'a> {
    pub workflow_uuid: Uuid,
    pub name: &'a str,
    pub user_id: i64,
    pub module_name: &'a str,
    pub counter_finished: i32,
    pub definition_hash: Option<&'a str>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Fila de `deposit_checkpoints`.
#[derive(Queryable, Debug)]
pub struct CheckpointRow {
    pub id: i64,
    pub workflow_uuid: Uuid,
    pub user_id: i64,
    pub deposition_type: String,
    pub status: String,
    pub current_step: i32,
    pub obj_json: Value,
    pub modified: DateTime<Utc>,
}

impl CheckpointRow {
    fn into_checkpoint(self) -> Result<Checkpoint, PersistenceError> {
        let status = self.status
                         .parse::<WorkflowStatus>()
                         .map_err(|e| PersistenceError::Unknown(e.to_string()))?;
        Ok(Checkpoint { id: self.id,
                        uuid: self.workflow_uuid,
                        user_id: UserId(self.user_id),
                        deposition_type: self.deposition_type,
                        status,
                        current_step: from_db_index(self.current_step)?,
                        obj_json: self.obj_json,
                        modified: self.modified })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = deposit_checkpoints)]
pub struct NewCheckpointRow<'a> {
    pub workflow_uuid: Uuid,
    pub user_id: i64,
    pub deposition_type: &'a str,
    pub status: &'a str,
    pub current_step: i32,
    pub obj_json: &'a Value,
    pub modified: DateTime<Utc>,
}

/// Fila de `deposit_execution_records`.
#[derive(Queryable, Debug)]
pub struct ExecutionRow {
    pub id: i64,
    pub workflow_uuid: Uuid,
    pub task_counter: i32,
    pub data: Value,
    pub modified: DateTime<Utc>,
}

impl ExecutionRow {
    fn into_record(self) -> Result<ExecutionRecord, PersistenceError> {
        Ok(ExecutionRecord { id: self.id,
                             workflow_uuid: self.workflow_uuid,
                             task_counter: from_db_index(self.task_counter)?,
                             data: self.data,
                             modified: self.modified })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = deposit_execution_records)]
pub struct NewExecutionRow<'a> {
    pub workflow_uuid: Uuid,
    pub task_counter: i32,
    pub data: &'a Value,
    pub modified: DateTime<Utc>,
}

fn to_db_index(value: usize) -> Result<i32, PersistenceError> {
    i32::try_from(value).map_err(|_| PersistenceError::OutOfRange(format!("step index {value} exceeds INTEGER")))
}

fn from_db_index(value: i32) -> Result<usize, PersistenceError> {
    usize::try_from(value).map_err(|_| PersistenceError::OutOfRange(format!("negative step index {value}")))
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
///
/// Cubre conflictos de serialización, errores de IO del pool y mensajes
/// comunes de desconexión/timeout detectados por texto (best-effort).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Errores tras los que la transacción quedó revertida con certeza. Una
/// conexión caída puede haber perdido sólo la confirmación del `COMMIT`, así
/// que no cuenta.
fn is_rolled_back(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::Unknown(msg) => msg.to_lowercase().contains("deadlock detected"),
        _ => false,
    }
}

/// Retry simple con backoff lineal muy pequeño (hasta 3 reintentos).
///
/// Backoff: 15ms, 30ms, 45ms. Se emite `warn!` por intento.
fn with_retry<F, T>(f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    with_retry_when(is_retryable, f)
}

fn with_retry_when<F, T>(retry: fn(&PersistenceError) -> bool, mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if retry(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// `CheckpointStore` sobre Postgres.
pub struct PgCheckpointStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgCheckpointStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl PgCheckpointStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> CheckpointStore for PgCheckpointStore<P> {
    fn save_workflow(&mut self, record: &WorkflowRecord) -> Result<(), StoreError> {
        use crate::schema::deposit_workflows::dsl as w;

        debug!("save_workflow: uuid={} name={}", record.uuid, record.name);
        let now = Utc::now();
        let row = NewWorkflowRow { workflow_uuid: record.uuid,
                                   name: &record.name,
                                   user_id: record.user_id.0,
                                   module_name: &record.module_name,
                                   counter_finished: record.counter_finished,
                                   definition_hash: record.definition_hash.as_deref(),
                                   created: record.created,
                                   modified: now };
        // El contador sólo se toca en el alta; después lo gobierna la
        // escritura terminal de `synchronize`.
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(w::deposit_workflows).values(&row)
                                                     .on_conflict(w::workflow_uuid)
                                                     .do_update()
                                                     .set((w::name.eq(row.name),
                                                           w::user_id.eq(row.user_id),
                                                           w::module_name.eq(row.module_name),
                                                           w::definition_hash.eq(row.definition_hash),
                                                           w::modified.eq(now)))
                                                     .execute(&mut conn)
                                                     .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    fn find_workflow(&self, uuid: Uuid) -> Result<Option<WorkflowRecord>, StoreError> {
        let row: Option<WorkflowRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            deposit_workflows::table.filter(deposit_workflows::workflow_uuid.eq(uuid))
                                    .first(&mut conn)
                                    .optional()
                                    .map_err(PersistenceError::from)
        })?;
        Ok(row.map(WorkflowRecord::from))
    }

    fn find_checkpoint(&self, uuid: Uuid) -> Result<Option<Checkpoint>, StoreError> {
        let row: Option<CheckpointRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            deposit_checkpoints::table.filter(deposit_checkpoints::workflow_uuid.eq(uuid))
                                      .first(&mut conn)
                                      .optional()
                                      .map_err(PersistenceError::from)
        })?;
        Ok(row.map(CheckpointRow::into_checkpoint).transpose()?)
    }

    fn create_checkpoint(&mut self, new: NewCheckpoint) -> Result<Checkpoint, StoreError> {
        let current_step = to_db_index(new.current_step)?;
        let row: CheckpointRow = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    // El estado inicial sigue al contador del workflow dueño.
                    let counter: Option<i32> =
                        deposit_workflows::table.filter(deposit_workflows::workflow_uuid.eq(new.uuid))
                                                .select(deposit_workflows::counter_finished)
                                                .first(tx)
                                                .optional()?;
                    let status = WorkflowStatus::from_counter(counter.unwrap_or(0));
                    diesel::insert_into(deposit_checkpoints::table)
                        .values(NewCheckpointRow { workflow_uuid: new.uuid,
                                                   user_id: new.user_id.0,
                                                   deposition_type: &new.deposition_type,
                                                   status: status.as_str(),
                                                   current_step,
                                                   obj_json: &new.obj_json,
                                                   modified: Utc::now() })
                        .get_result::<CheckpointRow>(tx)
                })
                .map_err(PersistenceError::from)
        })?;
        debug!("create_checkpoint: uuid={} id={}", new.uuid, row.id);
        Ok(row.into_checkpoint()?)
    }

    fn create_execution_record(&mut self, new: NewExecutionRecord) -> Result<ExecutionRecord, StoreError> {
        let task_counter = to_db_index(new.task_counter)?;
        let row: ExecutionRow = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(deposit_execution_records::table)
                .values(NewExecutionRow { workflow_uuid: new.workflow_uuid,
                                          task_counter,
                                          data: &new.data,
                                          modified: Utc::now() })
                .get_result(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        debug!("create_execution_record: uuid={} id={}", new.workflow_uuid, row.id);
        Ok(row.into_record()?)
    }

    fn list_execution_records(&self, uuid: Uuid) -> Result<Vec<ExecutionRecord>, StoreError> {
        let rows: Vec<ExecutionRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            deposit_execution_records::table.filter(deposit_execution_records::workflow_uuid.eq(uuid))
                                            .order(deposit_execution_records::id.asc())
                                            .load(&mut conn)
                                            .map_err(PersistenceError::from)
        })?;
        let records = rows.into_iter()
                          .map(ExecutionRow::into_record)
                          .collect::<Result<Vec<_>, _>>()?;
        debug!("list_execution_records: uuid={uuid} count={}", records.len());
        Ok(records)
    }

    fn synchronize(&mut self,
                   uuid: Uuid,
                   checkpoint: &CheckpointUpdate,
                   execution: &ExecutionUpdate)
                   -> Result<i32, StoreError> {
        use crate::schema::deposit_checkpoints::dsl as c;
        use crate::schema::deposit_execution_records::dsl as e;
        use crate::schema::deposit_workflows::dsl as w;

        let current_step = to_db_index(checkpoint.current_step)?;
        let task_counter = to_db_index(execution.task_counter)?;
        let retry: fn(&PersistenceError) -> bool = if checkpoint.finish { is_rolled_back } else { is_retryable };
        let counter: i32 = with_retry_when(retry, || {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    let now = Utc::now();
                    // La fila del workflow se bloquea primero; el estado del
                    // checkpoint sale del contador que queda aquí.
                    let counter: i32 = if checkpoint.finish {
                        diesel::update(w::deposit_workflows.filter(w::workflow_uuid.eq(uuid)))
                            .set((w::counter_finished.eq(w::counter_finished + 1), w::modified.eq(now)))
                            .returning(w::counter_finished)
                            .get_result(tx)?
                    } else {
                        w::deposit_workflows.filter(w::workflow_uuid.eq(uuid))
                                            .select(w::counter_finished)
                                            .for_update()
                                            .first(tx)?
                    };
                    let status = WorkflowStatus::from_counter(counter);
                    let updated = diesel::update(c::deposit_checkpoints.filter(c::workflow_uuid.eq(uuid)))
                        .set((c::status.eq(status.as_str()),
                              c::current_step.eq(current_step),
                              c::obj_json.eq(&checkpoint.obj_json),
                              c::modified.eq(now)))
                        .execute(tx)?;
                    if updated == 0 {
                        return Err(DieselError::NotFound);
                    }
                    let updated = diesel::update(e::deposit_execution_records.filter(e::id.eq(execution.id))
                                                                             .filter(e::workflow_uuid.eq(uuid)))
                        .set((e::task_counter.eq(task_counter), e::data.eq(&execution.data), e::modified.eq(now)))
                        .execute(tx)?;
                    // Sin registro de ejecución no se confirma nada.
                    if updated == 0 {
                        return Err(DieselError::NotFound);
                    }
                    Ok(counter)
                })
                .map_err(PersistenceError::from)
        })?;
        debug!("synchronize: uuid={uuid} step={} execution_id={} finish={} counter_finished={counter}",
               checkpoint.current_step,
               execution.id,
               checkpoint.finish);
        Ok(counter)
    }
}

/// Construye un pool Postgres r2d2 a partir de URL y corre las migraciones.
///
/// Si `min_size > max_size` se usa `min_size = max_size`. Devuelve
/// `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("build_pool: min_size > max_size ({} > {}), ajustando min=max",
              validated_min,
              validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_gives_up_after_three_retries() {
        let mut calls = 0;
        let res: Result<(), PersistenceError> = with_retry(|| {
            calls += 1;
            Err(PersistenceError::SerializationConflict)
        });
        assert!(matches!(res, Err(PersistenceError::SerializationConflict)));
        assert_eq!(calls, 4);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let res: Result<(), PersistenceError> = with_retry(|| {
            calls += 1;
            Err(PersistenceError::UniqueViolation("dup".into()))
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn finishing_write_only_retries_rolled_back_errors() {
        let mut calls = 0;
        let res: Result<(), PersistenceError> = with_retry_when(is_rolled_back, || {
            calls += 1;
            Err(PersistenceError::TransientIo("connection closed".into()))
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
        assert!(is_rolled_back(&PersistenceError::SerializationConflict));
        assert!(is_rolled_back(&PersistenceError::Unknown("ERROR: deadlock detected".into())));
    }

    #[test]
    fn textual_disconnects_are_retryable() {
        assert!(is_retryable(&PersistenceError::Unknown("Connection refused (os error 111)".into())));
        assert!(!is_retryable(&PersistenceError::Unknown("syntax error".into())));
    }

    #[test]
    fn step_indexes_are_range_checked() {
        assert_eq!(to_db_index(7).unwrap(), 7);
        assert!(matches!(to_db_index(usize::MAX), Err(PersistenceError::OutOfRange(_))));
        assert!(matches!(from_db_index(-1), Err(PersistenceError::OutOfRange(_))));
    }
}
