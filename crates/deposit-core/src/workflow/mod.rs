//! Controlador de workflows de depósito.
//!
//! Provee el controlador (`DepositionWorkflow`), su builder y los tipos de
//! resultado de avanzar/reanudar.

pub mod builder;
pub mod controller;
pub mod outcome;
pub mod output;

pub use builder::WorkflowBuilder;
pub use controller::DepositionWorkflow;
pub use outcome::{RunOutcome, StepAdvance};
pub use output::WorkflowOutput;
