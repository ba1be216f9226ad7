use axum::response::Html;
use axum::routing::get;
use axum::Router;
use dbdiag_shared::AppError;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::utils::{AppState, shutdown_signal};

#[axum::debug_handler]
async fn handler() -> Html<&'static str> {
  Html("<h1>dbdiag</h1><p>POST /ws/chat to start a diagnosis conversation.</p>")
}

pub async fn server(state: AppState, host: &str, port: u16) -> Result<(), AppError> {
  let app = Router::new()
    .route("/", get(handler))
    .merge(api::app())
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state);

  let addr = format!("{host}:{port}");
  let listener = TcpListener::bind(&addr).await?;
  tracing::info!(%addr, "server started");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}
