//! Identidad y atribución del workflow.
//!
//! Un workflow siempre pertenece a un actor. Si el llamador no pasa un
//! `user_id` explícito se consulta el `IdentityProvider` inyectado; no existe
//! un "usuario actual" global.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DepositError;

/// Identificador del actor dueño del workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Capacidad de resolver el actor ambiental (sesión web, variable de entorno,
/// doble de test...).
pub trait IdentityProvider {
    fn current_user(&self) -> Option<UserId>;
}

/// Actor fijo conocido de antemano.
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentity(pub UserId);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        Some(self.0)
    }
}

/// Sin actor ambiental: obliga a pasar `user_id` explícito.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAmbientIdentity;

impl IdentityProvider for NoAmbientIdentity {
    fn current_user(&self) -> Option<UserId> {
        None
    }
}

/// Par {uuid, user_id}. El uuid no cambia tras la creación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowIdentity {
    uuid: Uuid,
    user_id: UserId,
}

impl WorkflowIdentity {
    /// Resuelve la identidad: uuid nuevo si no se pasa, actor explícito o el
    /// del proveedor ambiental.
    pub fn resolve(uuid: Option<Uuid>,
                   user_id: Option<UserId>,
                   provider: &dyn IdentityProvider)
                   -> Result<Self, DepositError> {
        let user_id = user_id.or_else(|| provider.current_user())
                             .ok_or(DepositError::IdentityUnresolved)?;
        Ok(Self { uuid: uuid.unwrap_or_else(Uuid::new_v4),
                  user_id })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Reasigna el actor tras releer el registro dueño del workflow.
    pub(crate) fn rebind_user(&mut self, user_id: UserId) {
        self.user_id = user_id;
    }
}
