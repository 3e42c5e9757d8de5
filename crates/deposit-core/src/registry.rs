//! Registro de pasos: la secuencia ordenada que define un tipo de depósito.
//!
//! El registro queda fijo durante la vida de un controlador y determina
//! `steps_num`. Su `definition_hash` (ids ordenados + versión del motor) se
//! guarda junto al workflow para detectar que un depósito se reanuda con un
//! registro distinto al que lo creó.

use std::fmt;

use serde_json::json;

use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_value;
use crate::step::DepositionStep;

pub struct StepRegistry {
    steps: Vec<Box<dyn DepositionStep>>,
    definition_hash: String,
}

impl StepRegistry {
    pub fn new(steps: Vec<Box<dyn DepositionStep>>) -> Self {
        let ids: Vec<&str> = steps.iter().map(|s| s.id()).collect();
        let definition_hash = definition_hash_for(&ids);
        Self { steps, definition_hash }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Número de pasos (`steps_num`).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn DepositionStep> {
        self.steps.get(index).map(|s| s.as_ref())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
         .field("steps", &self.ids())
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}

impl FromIterator<Box<dyn DepositionStep>> for StepRegistry {
    fn from_iter<I: IntoIterator<Item = Box<dyn DepositionStep>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

pub fn definition_hash_for(step_ids: &[&str]) -> String {
    hash_value(&json!({
                   "engine_version": ENGINE_VERSION,
                   "steps": step_ids,
               }))
}
