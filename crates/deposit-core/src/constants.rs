//! Constantes del controlador de depósitos.
//!
//! Las claves de contexto son parte del contrato con los pasos externos y con
//! el blob persistido en el checkpoint: cambiarlas rompe la reanudación de
//! workflows ya guardados.

/// Versión lógica del controlador. Entra en el `definition_hash` del registro
/// de pasos, de modo que un cambio incompatible invalida los hashes guardados.
pub const ENGINE_VERSION: &str = "D1.0";

/// Namespace con el que se registran los workflows de depósito.
pub const DEFAULT_MODULE_NAME: &str = "webdeposit";

pub const KEY_UUID: &str = "uuid";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_STEP: &str = "step";
pub const KEY_DEPOSITION_TYPE: &str = "deposition_type";
/// Marca de finalización del recorrido del registro.
pub const KEY_BREAK: &str = "break";

/// Claves con columna propia en el checkpoint; nunca viajan en el blob.
pub const RESERVED_KEYS: [&str; 3] = [KEY_UUID, KEY_STEP, KEY_DEPOSITION_TYPE];
