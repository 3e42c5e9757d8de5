use deposit_core::store::CheckpointStore;
use deposit_core::{DepositionWorkflow, DirectEngine, InMemoryCheckpointStore, RunOutcome, UserId};
use deposit_flow::demo::{article_forms, article_registry, ARTICLE};
use deposit_flow::{CoreError, EnvIdentity, CONFIG};
use log::info;
use serde_json::{to_string_pretty, Value};
use tracing_subscriber::EnvFilter;

// Actor de la demo cuando no hay DEPOSIT_USER_ID.
const DEMO_USER: UserId = UserId(1);

/// Recorre un depósito "article": pausa en el formulario, fusiona los datos
/// del formulario en el contexto y reanuda hasta el final.
fn walk<S: CheckpointStore>(store: S, label: &str) -> Result<(), CoreError> {
    let mut builder = DepositionWorkflow::builder(store, DirectEngine::new(), ARTICLE).registry(article_registry())
                                                                                      .module_name(&CONFIG.module_name);
    if CONFIG.ambient_user.is_none() {
        builder = builder.user_id(DEMO_USER);
    }
    let mut wf = builder.build(&EnvIdentity::from_env())?;
    println!("[{label}] workflow uuid={} user={} steps={}",
             wf.uuid(),
             wf.user_id(),
             wf.steps_num());

    match wf.run()? {
        RunOutcome::Halted { step, hint } => println!("[{label}] pausa en step={step} hint={hint:?}"),
        other => println!("[{label}] resultado inesperado: {other:?}"),
    }

    let forms = article_forms(wf.uuid(), "On resumable deposits");
    let output = wf.get_output(&forms, true);
    println!("[{label}] formulario vigente válido={:?} borradores={}",
             output.valid,
             output.drafts);

    for (k, v) in wf.cook_json(&forms) {
        wf.context_mut().insert(k, v);
    }
    let outcome = wf.run()?;
    println!("[{label}] {outcome:?} status={} step={}",
             wf.get_status()?,
             wf.get_current_step());
    let ctx: Value = serde_json::to_value(wf.context()).map_err(|e| CoreError::Internal(e.to_string()))?;
    println!("[{label}] contexto final: {}",
             to_string_pretty(&ctx).unwrap_or_default());
    Ok(())
}

#[cfg(feature = "pg_demo")]
fn maybe_run_pg_demo() {
    if CONFIG.database_url.is_none() {
        eprintln!("[PG DEMO] DATABASE_URL no definido; omitiendo demo PG");
        return;
    }
    let res = deposit_persistence::build_dev_pool_from_env().map_err(CoreError::from)
                                                            .and_then(|pool| {
                                                                walk(deposit_persistence::PgCheckpointStore::from_pool(pool),
                                                                     "pg")
                                                            });
    if let Err(e) = res {
        eprintln!("[PG DEMO] Error: {e}");
    }
}

fn main() {
    // Cargar variables de entorno desde .env si existe (antes de leer CONFIG)
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env())
                             .init();
    info!("main-core: module_name={}", CONFIG.module_name);

    if let Err(e) = walk(InMemoryCheckpointStore::new(), "memoria") {
        eprintln!("[memoria] Error: {e}");
        std::process::exit(1);
    }

    #[cfg(feature = "pg_demo")]
    maybe_run_pg_demo();
}
