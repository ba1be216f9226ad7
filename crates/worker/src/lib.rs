//! Background job processing: the one job this system needs run out of
//! band is a full index rebuild, triggered from the web admin surface and
//! executed on an apalis-postgres worker so the HTTP request that triggers
//! it returns immediately.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::{Data, Monitor, WorkerBuilder};
use apalis_postgres::PostgresStorage;
use dbdiag_core::llm::OpenAiLlm;
use dbdiag_shared::{AppError, Config};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

/// Error type for the apalis job boundary. Jobs internally use `AppError`;
/// this wrapper converts at the worker boundary since apalis requires
/// `std::error::Error`.
#[derive(Debug)]
pub struct WorkerError(pub AppError);

impl std::fmt::Display for WorkerError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

impl std::error::Error for WorkerError {}

impl From<AppError> for WorkerError {
  fn from(err: AppError) -> Self {
    Self(err)
  }
}

impl From<anyhow::Error> for WorkerError {
  fn from(err: anyhow::Error) -> Self {
    Self(AppError::new(err))
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RebuildIndexJob;

async fn handle_rebuild_index(
  _job: RebuildIndexJob,
  db: Data<DatabaseConnection>,
  llm: Data<Arc<OpenAiLlm>>,
  cfg: Data<Arc<Config>>,
) -> Result<(), WorkerError> {
  tracing::info!("starting background index rebuild");
  let report = dbdiag_core::rebuild_index(llm.as_ref().as_ref(), cfg.max_retries, cfg.cluster_threshold, &db).await?;
  tracing::info!(
    phenomena = report.phenomena,
    root_causes = report.root_causes,
    ticket_phenomenon_links = report.ticket_phenomenon_links,
    phenomenon_root_cause_links = report.phenomenon_root_cause_links,
    "background index rebuild finished"
  );
  Ok(())
}

/// Run the worker until ctrl-c. `storage` is shared with the HTTP server so
/// it can enqueue `RebuildIndexJob`s.
pub async fn worker(
  db: DatabaseConnection,
  cfg: Arc<Config>,
  llm: Arc<OpenAiLlm>,
  storage: PostgresStorage<RebuildIndexJob>,
) -> Result<(), AppError> {
  Monitor::new()
    .register(move |_run_id| {
      WorkerBuilder::new("dbdiag-rebuild-index")
        .data(db.clone())
        .data(cfg.clone())
        .data(llm.clone())
        .backend(storage.clone())
        .build(handle_rebuild_index)
    })
    .shutdown_timeout(Duration::from_secs(5))
    .run_with_signal(tokio::signal::ctrl_c())
    .await
    .map_err(|err| AppError::new(anyhow::Error::new(err)))?;

  Ok(())
}
