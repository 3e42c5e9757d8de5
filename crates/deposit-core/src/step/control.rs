//! Canal de vuelta desde un paso hacia el controlador.

use uuid::Uuid;

use crate::errors::DepositError;
use crate::identity::UserId;

/// Vista acotada del controlador que recibe cada paso.
///
/// El paso no obtiene acceso mutable al controlador completo; sólo puede
/// leer su posición y pedir que el cursor salte a un índice concreto en lugar
/// de avanzar uno.
#[derive(Debug, Clone)]
pub struct StepControl {
    uuid: Uuid,
    user_id: UserId,
    index: usize,
    steps_num: usize,
    jump: Option<usize>,
}

impl StepControl {
    pub fn new(uuid: Uuid, user_id: UserId, index: usize, steps_num: usize) -> Self {
        Self { uuid,
               user_id,
               index,
               steps_num,
               jump: None }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Índice del paso en ejecución.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn steps_num(&self) -> usize {
        self.steps_num
    }

    /// Pide que, si el paso termina con éxito, el cursor quede en `target`.
    /// `target == steps_num` es válido y lleva al final del registro.
    pub fn jump_to(&mut self, target: usize) -> Result<(), DepositError> {
        if target > self.steps_num {
            return Err(DepositError::InvalidStepIndex { step: target,
                                                        steps_num: self.steps_num });
        }
        self.jump = Some(target);
        Ok(())
    }

    pub fn requested_jump(&self) -> Option<usize> {
        self.jump
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_is_bounded_by_registry_length() {
        let mut c = StepControl::new(Uuid::new_v4(), UserId(1), 0, 3);
        assert!(c.jump_to(3).is_ok());
        assert_eq!(c.requested_jump(), Some(3));
        assert_eq!(c.jump_to(4), Err(DepositError::InvalidStepIndex { step: 4, steps_num: 3 }));
        assert_eq!(c.requested_jump(), Some(3));
    }
}
