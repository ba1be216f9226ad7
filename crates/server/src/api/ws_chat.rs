use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response as AxumResponse;
use dbdiag_core::Response;
use serde::{Deserialize, Serialize};

use crate::utils::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
  #[serde(default)]
  pub mode: ChatMode,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
  #[default]
  Gar,
  Hyb,
  Rar,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientEvent {
  Message { content: String },
  Command { content: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerEvent {
  Output { html: String },
  Close { html: String },
}

pub async fn ws_chat(
  ws: WebSocketUpgrade,
  Query(query): Query<ChatQuery>,
  State(state): State<AppState>,
) -> AxumResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state, query.mode))
}

fn render_response(response: &Response) -> String {
  match response {
    Response::Recommend { phenomena, active_hypotheses } => {
      let items: Vec<String> = phenomena
        .iter()
        .enumerate()
        .map(|(i, p)| format!("<li>{}. {} (<em>{}</em>) &mdash; {}</li>", i + 1, p.description, p.observation_method, p.reason))
        .collect();
      let hyps: Vec<String> = active_hypotheses
        .iter()
        .map(|h| format!("<li>{} ({:.2})</li>", h.root_cause_description, h.confidence))
        .collect();
      format!(
        "<p>Please confirm or deny (e.g. <code>1确认 2否定</code>):</p><ol>{}</ol><p>Active hypotheses:</p><ul>{}</ul>",
        items.join(""),
        hyps.join("")
      )
    }
    Response::Diagnosis { root_cause_id, confidence, summary, cited_tickets } => format!(
      "<h3>Diagnosis: {root_cause_id} ({confidence:.2})</h3>{summary}<p>Cited: {}</p>",
      cited_tickets.join(", ")
    ),
    Response::AskInitialInfo => "<p>Tell me more about what you're observing.</p>".to_owned(),
    Response::AskMoreInfo { active_hypotheses } => {
      let hyps: Vec<String> = active_hypotheses
        .iter()
        .map(|h| format!("<li>{} ({:.2})</li>", h.root_cause_description, h.confidence))
        .collect();
      format!("<p>I need more information to narrow this down.</p><ul>{}</ul>", hyps.join(""))
    }
    Response::Error { message } => format!("<p class=\"error\">{message}</p>"),
  }
}

fn help_text(mode: ChatMode) -> String {
  format!(
    "<p>Mode: {mode:?}. Commands: <code>/help</code> <code>/reset</code> <code>/exit</code> <code>/status</code>.</p>"
  )
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
  let Ok(text) = serde_json::to_string(event) else { return false };
  socket.send(WsMessage::Text(text.into())).await.is_ok()
}

#[allow(clippy::too_many_lines)]
async fn handle_socket(mut socket: WebSocket, state: AppState, mode: ChatMode) {
  let mut session_id: Option<String> = None;

  if !send_event(&mut socket, &ServerEvent::Output { html: help_text(mode) }).await {
    return;
  }

  while let Some(Ok(msg)) = socket.recv().await {
    let WsMessage::Text(text) = msg else { continue };
    let Ok(event) = serde_json::from_str::<ClientEvent>(&text) else {
      if !send_event(&mut socket, &ServerEvent::Output { html: "<p class=\"error\">could not parse message</p>".to_owned() }).await {
        break;
      }
      continue;
    };

    match event {
      ClientEvent::Command { content } => match content.trim() {
        "/help" => {
          if !send_event(&mut socket, &ServerEvent::Output { html: help_text(mode) }).await {
            break;
          }
        }
        "/reset" => {
          session_id = None;
          if !send_event(&mut socket, &ServerEvent::Output { html: "<p>session reset</p>".to_owned() }).await {
            break;
          }
        }
        "/status" => {
          let html = session_id
            .as_ref()
            .map_or_else(|| "<p>no active session</p>".to_owned(), |id| format!("<p>session {id}</p>"));
          if !send_event(&mut socket, &ServerEvent::Output { html }).await {
            break;
          }
        }
        "/exit" => {
          let _ = send_event(&mut socket, &ServerEvent::Close { html: "<p>goodbye</p>".to_owned() }).await;
          break;
        }
        other => {
          if !send_event(&mut socket, &ServerEvent::Output { html: format!("<p class=\"error\">unknown command: {other}</p>") }).await {
            break;
          }
        }
      },
      ClientEvent::Message { content } => {
        let turn_result = run_turn(&state, mode, &mut session_id, content).await;
        let html = match turn_result {
          Ok(response) => render_response(&response),
          Err(err) => render_response(&Response::Error { message: err.to_string() }),
        };
        if !send_event(&mut socket, &ServerEvent::Output { html }).await {
          break;
        }
      }
    }
  }
}

async fn run_turn(
  state: &AppState,
  mode: ChatMode,
  session_id: &mut Option<String>,
  content: String,
) -> Result<Response, dbdiag_shared::AppError> {
  match session_id.clone() {
    None => {
      let (id, response) = match mode {
        ChatMode::Gar => state.gar.start_conversation(content, &state.db).await?,
        ChatMode::Hyb => state.hyb.start_conversation(content, &state.db).await?,
        ChatMode::Rar => state.rar.start_conversation(content, &state.db).await?,
      };
      *session_id = Some(id);
      Ok(response)
    }
    Some(id) => match mode {
      ChatMode::Gar => state.gar.continue_conversation(&id, content, &state.db).await,
      ChatMode::Hyb => state.hyb.continue_conversation(&id, content, &state.db).await,
      ChatMode::Rar => state.rar.continue_conversation(&id, content, &state.db).await,
    },
  }
}
