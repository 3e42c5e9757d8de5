//! Actor ambiental tomado de la configuración del proceso.

use deposit_core::{IdentityProvider, UserId};

use crate::config::{AppConfig, CONFIG};

/// `IdentityProvider` respaldado por `DEPOSIT_USER_ID`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvIdentity {
    user: Option<UserId>,
}

impl EnvIdentity {
    /// Usa la configuración global (`CONFIG`).
    pub fn from_env() -> Self {
        Self::from_config(&CONFIG)
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self { user: cfg.ambient_user }
    }
}

impl IdentityProvider for EnvIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user
    }
}
