//! `dbdiag cli`: an interactive read-eval-print loop over stdin/stdout,
//! calling the same `DialogueManager`/`Rar` the web server uses.

use std::io::{self, Write};

use dbdiag_core::dialogue::Strategy;
use dbdiag_core::llm::OpenAiLlm;
use dbdiag_core::{DialogueManager, Gar, Hyb, Rar, Response};
use dbdiag_shared::{AppError, Config};
use sea_orm::DatabaseConnection;

pub enum Mode {
  Gar,
  Hyb,
  Rar,
}

fn render(response: &Response) -> String {
  match response {
    Response::Recommend { phenomena, active_hypotheses } => {
      let mut out = String::from("Please confirm or deny:\n");
      for (i, p) in phenomena.iter().enumerate() {
        out.push_str(&format!("  {}. {} ({}) — {}\n", i + 1, p.description, p.observation_method, p.reason));
      }
      out.push_str("Active hypotheses:\n");
      for h in active_hypotheses {
        out.push_str(&format!("  - {} ({:.2})\n", h.root_cause_description, h.confidence));
      }
      out
    }
    Response::Diagnosis { root_cause_id, confidence, summary, cited_tickets } => {
      format!("Diagnosis: {root_cause_id} (confidence {confidence:.2})\n\n{summary}\n\nCited: {}\n", cited_tickets.join(", "))
    }
    Response::AskInitialInfo => "Tell me more about what you're observing.\n".to_owned(),
    Response::AskMoreInfo { active_hypotheses } => {
      let mut out = String::from("I need more information to narrow this down.\n");
      for h in active_hypotheses {
        out.push_str(&format!("  - {} ({:.2})\n", h.root_cause_description, h.confidence));
      }
      out
    }
    Response::Error { message } => format!("error: {message}\n"),
  }
}

fn is_terminal(response: &Response) -> bool {
  matches!(response, Response::Diagnosis { .. })
}

fn read_line(prompt: &str) -> io::Result<Option<String>> {
  print!("{prompt}");
  io::stdout().flush()?;
  let mut line = String::new();
  let bytes = io::stdin().read_line(&mut line)?;
  if bytes == 0 {
    return Ok(None);
  }
  Ok(Some(line.trim_end().to_owned()))
}

pub async fn run(mode: Mode, cfg: Config, db: &DatabaseConnection) -> Result<(), AppError> {
  println!("dbdiag interactive diagnosis. Ctrl-D to exit.");
  let Some(problem) = read_line("describe the problem> ")? else { return Ok(()) };
  if problem.is_empty() {
    return Ok(());
  }

  match mode {
    Mode::Gar => {
      let manager = DialogueManager::new(OpenAiLlm::new(cfg.clone()), Gar, cfg.clone());
      let (session_id, response) = manager.start_conversation(problem, db).await?;
      drive(&manager, session_id, response, db).await
    }
    Mode::Hyb => {
      let manager = DialogueManager::new(OpenAiLlm::new(cfg.clone()), Hyb, cfg.clone());
      let (session_id, response) = manager.start_conversation(problem, db).await?;
      drive(&manager, session_id, response, db).await
    }
    Mode::Rar => {
      let manager = Rar::new(OpenAiLlm::new(cfg.clone()), cfg.clone());
      let (session_id, response) = manager.start_conversation(problem, db).await?;
      drive_rar(&manager, session_id, response, db).await
    }
  }
}

async fn drive<S: Strategy>(
  manager: &DialogueManager<OpenAiLlm, S>,
  session_id: String,
  mut response: Response,
  db: &DatabaseConnection,
) -> Result<(), AppError> {
  loop {
    print!("{}", render(&response));
    if is_terminal(&response) {
      return Ok(());
    }
    let Some(reply) = read_line("> ")? else { return Ok(()) };
    if reply == "/exit" {
      return Ok(());
    }
    response = manager.continue_conversation(&session_id, reply, db).await?;
  }
}

async fn drive_rar(
  manager: &Rar<OpenAiLlm>,
  session_id: String,
  mut response: Response,
  db: &DatabaseConnection,
) -> Result<(), AppError> {
  loop {
    print!("{}", render(&response));
    if is_terminal(&response) {
      return Ok(());
    }
    let Some(reply) = read_line("> ")? else { return Ok(()) };
    if reply == "/exit" {
      return Ok(());
    }
    response = manager.continue_conversation(&session_id, reply, db).await?;
  }
}
