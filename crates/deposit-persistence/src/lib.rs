//! deposit-persistence
//!
//! Backend Postgres (Diesel) del `CheckpointStore` de `deposit-core`, más
//! utilidades de conexión y migraciones.
//!
//! Módulos:
//! - `pg`: `PgCheckpointStore`, pool r2d2 y política de reintentos.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas a mano.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgCheckpointStore, PgPool, PoolProvider};
