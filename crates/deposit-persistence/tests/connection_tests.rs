//! Pruebas básicas de configuración y pool (requiere DATABASE_URL válido en entorno).

use deposit_persistence::{config::DbConfig, pg::build_pool};
use diesel::connection::SimpleConnection;

#[test]
fn create_pool_from_env() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL no definido: omitiendo test");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    let pool = build_pool(&cfg.url, cfg.min_connections, cfg.max_connections).expect("pool");
    let mut conn = pool.get().expect("conn");
    conn.batch_execute("SELECT 1 FROM deposit_checkpoints LIMIT 1;")
        .expect("tables migrated");
}

#[test]
fn min_larger_than_max_is_clamped() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    let pool = build_pool(&cfg.url, 4, 2).expect("pool");
    assert_eq!(pool.max_size(), 2);
}
