//! Builder para `DepositionWorkflow`.
//!
//! Reúne las piezas opcionales de la construcción (handle existente, uuid,
//! actor explícito, registro de pasos) y en `build` resuelve, en este orden:
//! identidad, handle del workflow, checkpoint y registro de ejecución.
//!
//! ```ignore
//! let wf = DepositionWorkflow::builder(store, DirectEngine::new(), "article")
//!     .step(step_fn("metadata", metadata))
//!     .step(step_fn("files", files))
//!     .build(&StaticIdentity(UserId(1)))?;
//! ```

use log::{debug, info, warn};
use uuid::Uuid;

use crate::constants::DEFAULT_MODULE_NAME;
use crate::context::WorkflowContext;
use crate::engine::ExecutionEngine;
use crate::errors::DepositError;
use crate::identity::{IdentityProvider, UserId, WorkflowIdentity};
use crate::registry::StepRegistry;
use crate::step::DepositionStep;
use crate::store::{latest_execution_record, CheckpointStore, NewCheckpoint, NewExecutionRecord, WorkflowRecord};

use super::DepositionWorkflow;

pub struct WorkflowBuilder<S: CheckpointStore, X: ExecutionEngine> {
    store: S,
    engine: X,
    deposition_type: String,
    handle: Option<WorkflowRecord>,
    registry: Option<StepRegistry>,
    steps: Vec<Box<dyn DepositionStep>>,
    uuid: Option<Uuid>,
    user_id: Option<UserId>,
    module_name: String,
}

impl<S: CheckpointStore, X: ExecutionEngine> WorkflowBuilder<S, X> {
    pub(crate) fn new(store: S, engine: X, deposition_type: &str) -> Self {
        Self { store,
               engine,
               deposition_type: deposition_type.to_string(),
               handle: None,
               registry: None,
               steps: Vec::new(),
               uuid: None,
               user_id: None,
               module_name: DEFAULT_MODULE_NAME.to_string() }
    }

    /// Reanuda un workflow existente.
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Handle ya cargado del workflow; evita crear uno nuevo.
    pub fn handle(mut self, handle: WorkflowRecord) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn module_name(mut self, module_name: &str) -> Self {
        self.module_name = module_name.to_string();
        self
    }

    /// Registro completo. Tiene prioridad sobre los pasos sueltos de `step`.
    pub fn registry(mut self, registry: StepRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn step<T: DepositionStep + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn build(self, identity: &dyn IdentityProvider) -> Result<DepositionWorkflow<S, X>, DepositError> {
        let Self { mut store,
                   engine,
                   deposition_type,
                   handle,
                   registry,
                   steps,
                   uuid,
                   user_id,
                   module_name } = self;

        if let (Some(uuid), Some(h)) = (uuid, handle.as_ref()) {
            if h.uuid != uuid {
                return Err(DepositError::HandleMismatch { uuid, handle: h.uuid });
            }
        }
        let uuid = uuid.or_else(|| handle.as_ref().map(|h| h.uuid));
        let identity = WorkflowIdentity::resolve(uuid, user_id, identity)?;
        let uuid = identity.uuid();
        let registry = registry.unwrap_or_else(|| StepRegistry::new(steps));
        let steps_num = registry.len();
        let mut context = WorkflowContext::new(identity.user_id(), &deposition_type);

        // Handle del motor: el provisto, el persistido o uno nuevo.
        let mut handle = match handle {
            Some(h) => h,
            None => store.find_workflow(uuid)?
                         .unwrap_or_else(|| WorkflowRecord::new(uuid, &deposition_type, identity.user_id(), &module_name)),
        };
        if let Some(previous) = handle.definition_hash.as_deref() {
            if previous != registry.definition_hash() {
                warn!("build: definition hash changed uuid={uuid} previous={previous} current={}",
                      registry.definition_hash());
            }
        }
        handle.definition_hash = Some(registry.definition_hash().to_string());
        store.save_workflow(&handle)?;

        // Checkpoint: enlazar el existente o crear uno con el contexto inicial.
        let mut current_step = 0;
        let checkpoint_id = match store.find_checkpoint(uuid)? {
            Some(cp) => {
                context.merge_blob(&cp.obj_json);
                context.set_user_id(identity.user_id());
                current_step = if cp.current_step > steps_num {
                    warn!("build: checkpoint step {} beyond registry (steps_num={steps_num}) uuid={uuid}, clamping",
                          cp.current_step);
                    steps_num
                } else {
                    cp.current_step
                };
                if current_step > 0 {
                    context.set_step(current_step);
                }
                info!("build: resumed uuid={uuid} checkpoint_id={} step={current_step}", cp.id);
                cp.id
            }
            None => {
                let cp = store.create_checkpoint(NewCheckpoint { uuid,
                                                                 user_id: identity.user_id(),
                                                                 deposition_type: deposition_type.clone(),
                                                                 current_step,
                                                                 obj_json: context.to_blob() })?;
                info!("build: created uuid={uuid} checkpoint_id={} type={deposition_type}", cp.id);
                cp.id
            }
        };

        let records = store.list_execution_records(uuid)?;
        let execution_id = match latest_execution_record(&records) {
            Some(rec) => rec.id,
            None => {
                store.create_execution_record(NewExecutionRecord { workflow_uuid: uuid,
                                                                   task_counter: current_step,
                                                                   data: context.to_blob() })?
                     .id
            }
        };
        debug!("build: bound uuid={uuid} execution_id={execution_id} steps_num={steps_num}");

        Ok(DepositionWorkflow::from_parts(store,
                                          engine,
                                          identity,
                                          handle,
                                          registry,
                                          context,
                                          current_step,
                                          checkpoint_id,
                                          execution_id))
    }
}
