//! Deposit Flow
//!
//! Crate raíz del workspace:
//! - `config`: configuración de la aplicación desde el entorno (`CONFIG`).
//! - `errors`: error de nivel aplicación que agrupa core y persistencia.
//! - `identity`: actor ambiental leído del entorno (`EnvIdentity`).
//! - `demo`: tipo de depósito de ejemplo usado por `main-core`.
//!
//! El controlador vive en `deposit-core` y el backend Postgres en
//! `deposit-persistence`.

pub mod config;
pub mod demo;
pub mod errors;
pub mod identity;

pub use config::{AppConfig, CONFIG};
pub use errors::core_error::CoreError;
pub use identity::EnvIdentity;
