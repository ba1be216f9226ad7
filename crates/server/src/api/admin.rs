use apalis::prelude::TaskSink;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use dbdiag_shared::AppError;
use dbdiag_worker::RebuildIndexJob;
use serde::Serialize;
use utoipa::ToSchema;

use crate::utils::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RebuildQueued {
  pub queued: bool,
}

/// Enqueue a background index rebuild.
#[utoipa::path(
  post,
  path = "/api/v0/rebuild-index",
  responses((status = 200, description = "rebuild queued", body = RebuildQueued))
)]
pub async fn rebuild_index(State(state): State<AppState>) -> Result<Json<RebuildQueued>, AppError> {
  let mut storage = state.rebuild_job_storage.clone();
  storage.push(RebuildIndexJob).await?;
  Ok(Json(RebuildQueued { queued: true }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
  pub status: &'static str,
}

#[utoipa::path(get, path = "/api/v0/health", responses((status = 200, body = Health)))]
pub async fn health() -> (StatusCode, Json<Health>) {
  (StatusCode::OK, Json(Health { status: "ok" }))
}
