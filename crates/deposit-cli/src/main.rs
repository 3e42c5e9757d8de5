//! deposit-cli: inspección y mantenimiento de workflows de depósito
//! persistidos en Postgres.
//!
//! Códigos de salida: 0 ok, 2 uso, 4 no encontrado / rechazado, 5 backend.

mod ops;

use clap::{Parser, Subcommand};
use deposit_persistence::{build_dev_pool_from_env, PgCheckpointStore};
use ops::CliError;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "deposit", about = "Inspecciona y reposiciona workflows de depósito")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estado, contador de finalización y cursor.
    Status {
        #[arg(long)]
        uuid: Uuid,
    },
    /// Workflow, checkpoint y registro de ejecución vigente como JSON.
    Show {
        #[arg(long)]
        uuid: Uuid,
    },
    /// Retrocede el cursor un paso (mínimo 1).
    Rewind {
        #[arg(long)]
        uuid: Uuid,
    },
    /// Fija el cursor en `step`.
    SetStep {
        #[arg(long)]
        uuid: Uuid,
        #[arg(long)]
        step: usize,
        /// Número de pasos del registro del tipo de depósito.
        #[arg(long, env = "DEPOSIT_STEPS_NUM")]
        steps: usize,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    if std::env::var("DATABASE_URL").is_err() {
        return Err(CliError::Rejected("requiere DATABASE_URL para operar contra backend persistente".into()));
    }
    let pool = build_dev_pool_from_env().map_err(|e| CliError::Backend(format!("pool error: {e}")))?;
    let mut store = PgCheckpointStore::from_pool(pool);

    match cli.command {
        Command::Status { uuid } => {
            let r = ops::status(&store, uuid)?;
            println!("uuid={} type={} user={} status={} counter_finished={} step={}",
                     r.uuid, r.deposition_type, r.user_id, r.status, r.counter_finished, r.current_step);
        }
        Command::Show { uuid } => {
            let v = ops::show(&store, uuid)?;
            let text = serde_json::to_string_pretty(&v).map_err(|e| CliError::Backend(e.to_string()))?;
            println!("{text}");
        }
        Command::Rewind { uuid } => {
            let step = ops::rewind(&mut store, uuid)?;
            println!("rewind: uuid={uuid} step={step}");
        }
        Command::SetStep { uuid, step, steps } => {
            ops::set_step(&mut store, uuid, step, steps)?;
            println!("set-step: uuid={uuid} step={step}");
        }
    }
    Ok(())
}

fn main() {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env())
                             .with_writer(std::io::stderr)
                             .init();

    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            let code = if e.use_stderr() { 2 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    if let Err(e) = run(cli) {
        eprintln!("[deposit] {e}");
        std::process::exit(e.exit_code());
    }
}
