//! Controlador de un workflow de depósito.
//!
//! Es la única máquina de estados del sistema: el cursor (`current_step`)
//! vive aquí y tanto `run_next_step` como `run` y la navegación lo mueven por
//! el mismo camino. Todas las operaciones que cambian estado terminan en una
//! única llamada a `synchronize`, que escribe checkpoint y registro de
//! ejecución (y, en la transición terminal, el contador de finalización) en
//! una sola transacción.
//!
//! Un paso que falla no avanza el cursor ni persiste nada: el contexto en
//! memoria se restaura al estado previo y reintentar vuelve a ejecutar el
//! mismo paso.

use log::{debug, info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::constants::KEY_BREAK;
use crate::context::WorkflowContext;
use crate::engine::ExecutionEngine;
use crate::errors::{DepositError, StoreError};
use crate::forms::FormProvider;
use crate::identity::{UserId, WorkflowIdentity};
use crate::registry::StepRegistry;
use crate::step::{StepControl, StepRunResult};
use crate::store::{latest_execution_record, CheckpointStore, CheckpointUpdate, ExecutionUpdate, WorkflowRecord,
                   WorkflowStatus};

use super::{RunOutcome, StepAdvance, WorkflowBuilder, WorkflowOutput};

pub struct DepositionWorkflow<S: CheckpointStore, X: ExecutionEngine> {
    store: S,
    engine: X,
    identity: WorkflowIdentity,
    handle: WorkflowRecord,
    registry: StepRegistry,
    context: WorkflowContext,
    current_step: usize,
    checkpoint_id: i64,
    execution_id: i64,
}

impl<S: CheckpointStore, X: ExecutionEngine> DepositionWorkflow<S, X> {
    /// Crea un builder; `deposition_type` nombra el tipo de workflow.
    pub fn builder(store: S, engine: X, deposition_type: &str) -> WorkflowBuilder<S, X> {
        WorkflowBuilder::new(store, engine, deposition_type)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(store: S,
                             engine: X,
                             identity: WorkflowIdentity,
                             handle: WorkflowRecord,
                             registry: StepRegistry,
                             context: WorkflowContext,
                             current_step: usize,
                             checkpoint_id: i64,
                             execution_id: i64)
                             -> Self {
        Self { store,
               engine,
               identity,
               handle,
               registry,
               context,
               current_step,
               checkpoint_id,
               execution_id }
    }

    pub fn uuid(&self) -> Uuid {
        self.identity.uuid()
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id()
    }

    pub fn deposition_type(&self) -> &str {
        self.context.deposition_type().unwrap_or(&self.handle.name)
    }

    pub fn steps_num(&self) -> usize {
        self.registry.len()
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut WorkflowContext {
        &mut self.context
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn handle(&self) -> &WorkflowRecord {
        &self.handle
    }

    pub fn checkpoint_id(&self) -> i64 {
        self.checkpoint_id
    }

    pub fn execution_id(&self) -> i64 {
        self.execution_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &X {
        &self.engine
    }

    /// Libera el controlador devolviendo el almacén (para reanudar con otro).
    pub fn into_store(self) -> S {
        self.store
    }

    /// Estado derivado del contador persistido; no se cachea.
    pub fn get_status(&self) -> Result<WorkflowStatus, DepositError> {
        let uuid = self.uuid();
        let record = self.store
                         .find_workflow(uuid)?
                         .ok_or(DepositError::MissingWorkflowRecord(uuid))?;
        Ok(WorkflowStatus::from_counter(record.counter_finished))
    }

    pub fn get_current_step(&self) -> usize {
        self.current_step
    }

    pub fn set_current_step(&mut self, step: usize, synchronize: bool) -> Result<(), DepositError> {
        let steps_num = self.steps_num();
        if step > steps_num {
            return Err(DepositError::InvalidStepIndex { step, steps_num });
        }
        self.current_step = step;
        self.context.set_step(step);
        if synchronize {
            self.update_db()?;
        }
        Ok(())
    }

    /// Ejecuta o reanuda el workflow desde el registro de ejecución más
    /// reciente, deteniéndose en la siguiente pausa explícita.
    pub fn run(&mut self) -> Result<RunOutcome, DepositError> {
        let uuid = self.uuid();
        let record = self.store
                         .find_workflow(uuid)?
                         .ok_or(DepositError::MissingWorkflowRecord(uuid))?;
        if record.counter_finished > 1 {
            debug!("run: already finished uuid={uuid} counter_finished={}", record.counter_finished);
            return Ok(RunOutcome::AlreadyFinished);
        }

        let records = self.store.list_execution_records(uuid)?;
        let latest = latest_execution_record(&records).ok_or(DepositError::MissingExecutionRecord(uuid))?;
        let steps_num = self.steps_num();
        if latest.task_counter > steps_num {
            return Err(DepositError::InvalidStepIndex { step: latest.task_counter,
                                                        steps_num });
        }
        info!("run: resuming uuid={uuid} from step={} execution_id={}",
              latest.task_counter,
              latest.id);
        self.execution_id = latest.id;
        self.current_step = latest.task_counter;
        self.context.set_step(self.current_step);

        loop {
            match self.advance()? {
                StepAdvance::Advanced { .. } => continue,
                StepAdvance::Halted { step, hint } => return Ok(RunOutcome::Halted { step, hint }),
                StepAdvance::Completed | StepAdvance::AlreadyComplete => return Ok(RunOutcome::Completed),
            }
        }
    }

    /// Ejecuta el paso bajo el cursor, o la transición terminal si el cursor
    /// ya llegó al final del registro.
    pub fn run_next_step(&mut self) -> Result<StepAdvance, DepositError> {
        self.advance()
    }

    /// Avanza el cursor al siguiente paso sin ejecutar el actual.
    pub fn jump_forward(&mut self, synchronize: bool) -> Result<usize, DepositError> {
        if self.current_step < self.steps_num() {
            self.current_step += 1;
        }
        self.context.set_step(self.current_step);
        if synchronize {
            self.update_db()?;
        }
        Ok(self.current_step)
    }

    /// Retrocede un paso; nunca por debajo de 1.
    pub fn jump_backwards(&mut self, synchronize: bool) -> Result<usize, DepositError> {
        self.current_step = if self.current_step > 1 { self.current_step - 1 } else { 1 };
        self.context.set_step(self.current_step);
        if synchronize {
            self.update_db()?;
        }
        Ok(self.current_step)
    }

    /// Único punto de persistencia: cursor y blob del contexto (sin claves
    /// reservadas) en checkpoint + registro de ejecución. El estado lo
    /// deriva el almacén del contador persistido.
    pub fn update_db(&mut self) -> Result<(), DepositError> {
        self.write_checkpoint(false).map(|_| ())
    }

    fn write_checkpoint(&mut self, finish: bool) -> Result<i32, DepositError> {
        let uuid = self.uuid();
        let obj_json = self.context.to_blob();
        let checkpoint = CheckpointUpdate { current_step: self.current_step,
                                            obj_json: obj_json.clone(),
                                            finish };
        let execution = ExecutionUpdate { id: self.execution_id,
                                          task_counter: self.current_step,
                                          data: obj_json };
        let counter = match self.store.synchronize(uuid, &checkpoint, &execution) {
            Ok(c) => c,
            Err(StoreError::NotFound) => {
                if self.store.find_workflow(uuid)?.is_none() {
                    return Err(DepositError::MissingWorkflowRecord(uuid));
                }
                return Err(StoreError::NotFound.into());
            }
            Err(e) => return Err(e.into()),
        };
        self.handle.counter_finished = counter;
        debug!("update_db: uuid={uuid} status={} step={} execution_id={}",
               WorkflowStatus::from_counter(counter),
               self.current_step,
               self.execution_id);
        Ok(counter)
    }

    /// Relee el registro de ejecución y el workflow dueño tras una mutación
    /// externa y fusiona sus datos en el contexto local.
    pub fn update_workflow_object(&mut self) -> Result<(), DepositError> {
        let uuid = self.uuid();
        let records = self.store.list_execution_records(uuid)?;
        let latest = latest_execution_record(&records).ok_or(DepositError::MissingExecutionRecord(uuid))?;
        let workflow = self.store
                           .find_workflow(uuid)?
                           .ok_or(DepositError::MissingWorkflowRecord(uuid))?;

        self.execution_id = latest.id;
        self.identity.rebind_user(workflow.user_id);
        self.context.set_user_id(workflow.user_id);
        self.context.set_deposition_type(Some(&workflow.name));
        self.context.merge_blob(&latest.data);
        debug!("update_workflow_object: uuid={uuid} execution_id={} user_id={}",
               latest.id,
               workflow.user_id);
        self.handle = workflow;
        Ok(())
    }

    /// Fusiona los valores de los formularios de todos los pasos. Los pasos
    /// sin formulario se omiten. No depende del cursor.
    pub fn cook_json(&self, forms: &dyn FormProvider) -> Map<String, Value> {
        let (uuid, user_id) = (self.uuid(), self.user_id());
        let mut acc = Map::new();
        for step in 0..self.steps_num() {
            let Some(form) = forms.get_form(user_id, uuid, Some(step)) else {
                debug!("cook_json: no form for step={step} uuid={uuid}");
                continue;
            };
            for field in form.fields() {
                acc = field.cook_json(acc);
            }
        }
        acc
    }

    /// Datos listos para renderizar el paso vigente. No persiste nada.
    pub fn get_output(&self, forms: &dyn FormProvider, validate: bool) -> WorkflowOutput<'_, S, X> {
        let (uuid, user_id) = (self.uuid(), self.user_id());
        let deposition_type = self.deposition_type().to_string();
        let mut form = forms.get_form(user_id, uuid, Some(self.current_step));
        let drafts = forms.draft_field_get_all(user_id, &deposition_type);
        let valid = if validate { form.as_mut().map(|f| f.validate()) } else { None };
        WorkflowOutput { workflow: self,
                         deposition_type,
                         form,
                         drafts,
                         uuid,
                         valid }
    }

    fn advance(&mut self) -> Result<StepAdvance, DepositError> {
        let steps_num = self.steps_num();
        if self.current_step >= steps_num {
            return self.complete();
        }

        let index = self.current_step;
        let snapshot = self.context.clone();
        let step = match self.registry.get(index) {
            Some(s) => s,
            None => return Err(DepositError::InvalidStepIndex { step: index, steps_num }),
        };
        let step_id = step.id().to_string();
        let mut control = StepControl::new(self.identity.uuid(), self.identity.user_id(), index, steps_num);
        let result = self.engine.invoke(index, step, &mut self.context, &mut control);

        match result {
            StepRunResult::Success => {
                let next = control.requested_jump().unwrap_or(index + 1);
                self.current_step = next;
                self.context.set_step(next);
                if let Err(e) = self.update_db() {
                    self.current_step = index;
                    self.context = snapshot;
                    return Err(e);
                }
                debug!("advance: uuid={} step_id={step_id} {index} -> {next}", self.uuid());
                Ok(StepAdvance::Advanced { step: next })
            }
            StepRunResult::Halt { hint } => {
                self.context.set_step(index);
                if let Err(e) = self.update_db() {
                    self.context = snapshot;
                    return Err(e);
                }
                info!("advance: halted uuid={} step_id={step_id} index={index} hint={:?}",
                      self.uuid(),
                      hint);
                Ok(StepAdvance::Halted { step: index, hint })
            }
            StepRunResult::Failure { message } => {
                self.context = snapshot;
                warn!("advance: step failed uuid={} step_id={step_id} index={index}: {message}",
                      self.uuid());
                Err(DepositError::StepFailed { index,
                                               step_id,
                                               message })
            }
        }
    }

    /// Transición terminal: marca `break` e incrementa el contador de
    /// finalización en la misma escritura que el checkpoint.
    fn complete(&mut self) -> Result<StepAdvance, DepositError> {
        if self.context.is_complete() {
            return Ok(StepAdvance::AlreadyComplete);
        }
        let uuid = self.uuid();
        self.context.mark_complete();
        let counter = match self.write_checkpoint(true) {
            Ok(c) => c,
            Err(e) => {
                self.context.remove(KEY_BREAK);
                warn!("complete: terminal write failed uuid={uuid}: {e}");
                return Err(e);
            }
        };
        info!("complete: uuid={uuid} counter_finished={counter}");
        Ok(StepAdvance::Completed)
    }
}
