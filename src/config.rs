//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable (`CONFIG`).
//!
//! Variables:
//! - `DATABASE_URL`: opcional; sin ella la demo corre sólo en memoria.
//! - `DEPOSIT_USER_ID`: actor ambiental para `EnvIdentity`.
//! - `DEPOSIT_MODULE_NAME`: espacio de nombres del motor (`webdeposit`).

use std::env;

use deposit_core::constants::DEFAULT_MODULE_NAME;
use deposit_core::UserId;
use log::warn;
use once_cell::sync::Lazy;

use crate::errors::core_error::CoreError;

/// Configuración global de la aplicación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    /// Actor autenticado del proceso, si lo hay.
    pub ambient_user: Option<UserId>,
    pub module_name: String,
}

impl AppConfig {
    /// Lee la configuración de un lookup de variables; `from_env` usa el
    /// entorno del proceso.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
        where F: Fn(&str) -> Option<String>
    {
        let ambient_user = match lookup("DEPOSIT_USER_ID") {
            Some(raw) => {
                let id = raw.trim()
                            .parse::<i64>()
                            .map_err(|e| CoreError::Config(format!("DEPOSIT_USER_ID inválido '{raw}': {e}")))?;
                Some(UserId(id))
            }
            None => None,
        };
        let module_name = lookup("DEPOSIT_MODULE_NAME").filter(|m| !m.trim().is_empty())
                                                       .unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string());
        Ok(Self { database_url: lookup("DATABASE_URL"),
                  ambient_user,
                  module_name })
    }

    pub fn from_env() -> Result<Self, CoreError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez. Una
/// variable mal formada se registra y se ignora.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    AppConfig::from_env().unwrap_or_else(|e| {
                             warn!("config: {e}; usando valores por defecto");
                             AppConfig { database_url: env::var("DATABASE_URL").ok(),
                                         ambient_user: None,
                                         module_name: DEFAULT_MODULE_NAME.to_string() }
                         })
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.ambient_user, None);
        assert_eq!(cfg.module_name, "webdeposit");
    }

    #[test]
    fn reads_ambient_user_and_module() {
        let cfg = AppConfig::from_lookup(lookup(&[("DEPOSIT_USER_ID", " 17 "), ("DEPOSIT_MODULE_NAME", "thesis")])).unwrap();
        assert_eq!(cfg.ambient_user, Some(UserId(17)));
        assert_eq!(cfg.module_name, "thesis");
    }

    #[test]
    fn malformed_user_id_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("DEPOSIT_USER_ID", "abc")])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
