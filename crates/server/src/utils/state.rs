use std::sync::Arc;

use apalis_postgres::PostgresStorage;
use dbdiag_core::llm::OpenAiLlm;
use dbdiag_core::{DialogueManager, Gar, Hyb, Rar};
use dbdiag_shared::Config;
use dbdiag_worker::RebuildIndexJob;
use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
  pub db: DatabaseConnection,
  pub cfg: Arc<Config>,
  pub gar: Arc<DialogueManager<OpenAiLlm, Gar>>,
  pub hyb: Arc<DialogueManager<OpenAiLlm, Hyb>>,
  pub rar: Arc<Rar<OpenAiLlm>>,
  pub rebuild_job_storage: PostgresStorage<RebuildIndexJob>,
}

impl AppState {
  #[must_use]
  pub fn new(
    db: DatabaseConnection,
    cfg: Arc<Config>,
    rebuild_job_storage: PostgresStorage<RebuildIndexJob>,
  ) -> Self {
    Self {
      db,
      gar: Arc::new(DialogueManager::new(OpenAiLlm::new((*cfg).clone()), Gar, (*cfg).clone())),
      hyb: Arc::new(DialogueManager::new(OpenAiLlm::new((*cfg).clone()), Hyb, (*cfg).clone())),
      rar: Arc::new(Rar::new(OpenAiLlm::new((*cfg).clone()), (*cfg).clone())),
      cfg,
      rebuild_job_storage,
    }
  }
}
