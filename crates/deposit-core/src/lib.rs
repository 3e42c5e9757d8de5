//! deposit-core: controlador de workflows de depósito reanudables.
//!
//! Un workflow es una secuencia ordenada de pasos aplicada sobre un contexto
//! mutable. Su progreso se guarda en un checkpoint tras cada paso, de modo
//! que otro proceso (o el mismo tras un crash) puede reanudarlo desde el
//! último paso completado.
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod forms;
pub mod hashing;
pub mod identity;
pub mod registry;
pub mod step;
pub mod store;
pub mod workflow;

pub use context::WorkflowContext;
pub use engine::{DirectEngine, ExecutionEngine};
pub use errors::{DepositError, StoreError};
pub use forms::{DepositionForm, FormField, FormProvider, InMemoryFormProvider, JsonField, StaticForm};
pub use identity::{IdentityProvider, NoAmbientIdentity, StaticIdentity, UserId, WorkflowIdentity};
pub use registry::StepRegistry;
pub use step::{step_fn, DepositionStep, FnStep, StepControl, StepRunResult};
pub use store::{CheckpointStore, InMemoryCheckpointStore, WorkflowStatus};
pub use workflow::{DepositionWorkflow, RunOutcome, StepAdvance, WorkflowBuilder, WorkflowOutput};
