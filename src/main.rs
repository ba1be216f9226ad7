mod cli;
mod visualize;

use std::process::ExitCode;
use std::sync::Arc;

use apalis_postgres::PostgresStorage;
use clap::{Parser, Subcommand};
use dbdiag_core::knowledge_store::TicketImport;
use dbdiag_core::llm::OpenAiLlm;
use dbdiag_migration::{Migrator, MigratorTrait};
use dbdiag_shared::{AppError, Config, ErrorKind};
use dbdiag_worker::RebuildIndexJob;
use sea_orm::Database;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "dbdiag", about = "Multi-hypothesis database-incident diagnosis engine")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create or migrate the knowledge store schema.
  Init,
  /// Append rows to the raw tables from a JSON file.
  Import { file: String },
  /// Run the full offline index-rebuild pipeline.
  RebuildIndex,
  /// Launch an interactive diagnosis loop.
  Cli {
    #[arg(long)]
    hyb: bool,
    #[arg(long)]
    rar: bool,
  },
  /// Launch the WebSocket/HTTP server.
  Web {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 3000)]
    port: u16,
  },
  /// Emit a static HTML knowledge-graph page.
  Visualize {
    #[arg(long)]
    layout: Option<String>,
  },
}

fn exit_code_for(err: &AppError) -> u8 {
  match err.kind() {
    ErrorKind::TransientUpstream | ErrorKind::PermanentUpstream => 3,
    ErrorKind::DataIntegrity | ErrorKind::Capacity | ErrorKind::InvariantViolation | ErrorKind::Internal => 2,
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cli = Cli::parse();

  let cfg = match Config::load() {
    Ok(cfg) => cfg,
    Err(err) => {
      eprintln!("configuration error: {err}");
      return ExitCode::from(1);
    }
  };

  match run(cli.command, cfg).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("{err}");
      ExitCode::from(exit_code_for(&err))
    }
  }
}

async fn run(command: Command, cfg: Config) -> Result<(), AppError> {
  let db = Database::connect(cfg.database_url.as_str()).await?;

  match command {
    Command::Init => {
      Migrator::up(&db, None).await?;
      println!("knowledge store schema is up to date");
      Ok(())
    }
    Command::Import { file } => {
      let raw = std::fs::read_to_string(&file).map_err(|err| AppError::data_integrity(anyhow::Error::new(err)))?;
      let tickets: Vec<TicketImport> =
        serde_json::from_str(&raw).map_err(|err| AppError::data_integrity(anyhow::Error::new(err)))?;
      let count = dbdiag_core::import_tickets(tickets, &db).await?;
      println!("imported {count} tickets");
      Ok(())
    }
    Command::RebuildIndex => {
      let llm = OpenAiLlm::new(cfg.clone());
      let report = dbdiag_core::rebuild_index(&llm, cfg.max_retries, cfg.cluster_threshold, &db).await?;
      println!(
        "rebuilt index: {} phenomena, {} root causes, {} ticket-phenomenon links, {} phenomenon-root-cause links",
        report.phenomena, report.root_causes, report.ticket_phenomenon_links, report.phenomenon_root_cause_links
      );
      Ok(())
    }
    Command::Cli { hyb, rar } => {
      let mode = match (hyb, rar) {
        (_, true) => cli::Mode::Rar,
        (true, false) => cli::Mode::Hyb,
        (false, false) => cli::Mode::Gar,
      };
      cli::run(mode, cfg, &db).await
    }
    Command::Web { host, port } => run_web(cfg, db, &host, port).await,
    Command::Visualize { layout } => {
      let html = visualize::render(&db, layout.as_deref()).await?;
      println!("{html}");
      Ok(())
    }
  }
}

async fn run_web(cfg: Config, db: sea_orm::DatabaseConnection, host: &str, port: u16) -> Result<(), AppError> {
  let cfg = Arc::new(cfg);
  let llm = Arc::new(OpenAiLlm::new((*cfg).clone()));

  PostgresStorage::setup(&db.get_postgres_connection_pool()).await?;
  let rebuild_storage = PostgresStorage::<RebuildIndexJob>::new(db.get_postgres_connection_pool());

  let state = dbdiag_server::AppState::new(db.clone(), Arc::clone(&cfg), rebuild_storage.clone());

  let host = host.to_owned();
  tokio::try_join!(
    dbdiag_worker::worker(db, Arc::clone(&cfg), Arc::clone(&llm), rebuild_storage),
    dbdiag_server::server(state, &host, port),
  )?;
  Ok(())
}
