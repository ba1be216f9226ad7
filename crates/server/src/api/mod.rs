use axum::{
  Json, Router,
  routing::{get, post},
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::utils::AppState;

mod admin;
mod ws_chat;

pub use admin::{Health, RebuildQueued};
pub use ws_chat::ws_chat;

#[derive(OpenApi)]
#[openapi(
  info(
    title = "dbdiag API",
    version = "0.0.1",
    description = "Multi-hypothesis database-incident diagnosis engine"
  ),
  paths(admin::health, admin::rebuild_index),
  components(schemas(Health, RebuildQueued))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
  Json(ApiDoc::openapi())
}

pub fn app() -> Router<AppState> {
  Router::new()
    .route("/ws/chat", get(ws_chat::ws_chat))
    .route("/api/v0/health", get(admin::health))
    .route("/api/v0/rebuild-index", post(admin::rebuild_index))
    .route("/openapi.json", get(openapi_json))
    .merge(Scalar::with_url("/openapi/", ApiDoc::openapi()))
}
