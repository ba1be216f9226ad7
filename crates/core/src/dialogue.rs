//! Turn loop shared by GAR and Hyb, parameterized by a small `Strategy`
//! (initial candidate expansion + post-feedback hybrid expansion). RAR is a
//! separate type with its own loop, per the re-architecture note: three
//! variants sharing code by inheritance became one parameterized manager
//! plus one standalone type, not three near-duplicate classes.

use std::collections::HashMap;

use dbdiag_ai::{ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage};
use dbdiag_shared::{AppError, Config, ErrorKind, retry::with_backoff};
use schemars::JsonSchema;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::knowledge_store;
use crate::llm::Llm;
use crate::recommender::{self, Decision};
use crate::response_generator;
use crate::retriever;
use crate::session::{self, Hypothesis, SessionState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedPhenomenonView {
  pub phenomenon_id: String,
  pub description: String,
  pub observation_method: String,
  pub reason: String,
}

/// The manager's emitted turn response. `kind` discriminates the four
/// outcomes of §4.4's decision policy plus the error path of §4.5/§7.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
  Recommend { phenomena: Vec<RecommendedPhenomenonView>, active_hypotheses: Vec<Hypothesis> },
  Diagnosis { root_cause_id: String, confidence: f32, summary: String, cited_tickets: Vec<String> },
  AskInitialInfo,
  AskMoreInfo { active_hypotheses: Vec<Hypothesis> },
  Error { message: String },
}

/// §4.5.2/§7's turn-level error policy: any fatal error surfaced from a turn
/// becomes a user-visible `Response::Error` rather than tearing down the
/// caller (the REPL process, the WS connection) — `session::run_turn` only
/// commits on `Ok`, so the session was never advanced and retrying the same
/// message is correct-by-construction. Data integrity failures are the one
/// exception: they mean the stored state itself is untrustworthy, which
/// calls for operator intervention, not a chat response, so they propagate.
fn fatal_error_response(err: AppError) -> Result<Response, AppError> {
  if err.kind() == ErrorKind::DataIntegrity {
    return Err(err);
  }
  Ok(Response::Error { message: err.to_string() })
}

fn response_text(response: &Response) -> String {
  match response {
    Response::Recommend { phenomena, .. } => format!(
      "Please confirm or deny: {}",
      phenomena.iter().map(|p| p.description.as_str()).collect::<Vec<_>>().join("; ")
    ),
    Response::Diagnosis { summary, .. } => summary.clone(),
    Response::AskInitialInfo => "Tell me more about what you're observing.".to_owned(),
    Response::AskMoreInfo { .. } => "I need a bit more information to narrow this down.".to_owned(),
    Response::Error { message } => message.clone(),
  }
}

/// `{"<phenomenon_id>": "confirmed"|"denied"|"unknown"}` plus free-form
/// technical observations not already in the pending list — the slow
/// path's schema-constrained LLM output.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FeedbackExtraction {
  pub feedback: HashMap<String, FeedbackValue>,
  #[serde(default)]
  pub new_observations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackValue {
  Confirmed,
  Denied,
  Unknown,
}

/// Fast-path grammar: batch `(n, confirm|deny)` tokens, or a blanket
/// confirm/deny keyword with no batch indices present.
mod fast_path {
  use regex::Regex;

  const AFFIRMATIVE_KEYWORDS: &[&str] = &["都确认", "全部确认", "confirm all", "all confirm", "yes"];
  const NEGATIVE_KEYWORDS: &[&str] = &["都否定", "全部否定", "deny all", "all deny", "no"];

  pub enum FastPathResult {
    Batch(Vec<(usize, bool)>),
    BlanketConfirm,
    BlanketDeny,
    NoMatch,
  }

  fn batch_regex() -> Regex {
    Regex::new(r"(?i)(\d+)\s*(确认|否定|confirm|deny|yes|no)").expect("valid fast-path regex")
  }

  /// Parse `message` against the fast-path grammar described in §4.5.2.
  #[must_use]
  pub fn parse(message: &str) -> FastPathResult {
    let re = batch_regex();
    let matches: Vec<(usize, bool)> = re
      .captures_iter(message)
      .filter_map(|cap| {
        let n: usize = cap.get(1)?.as_str().parse().ok()?;
        let word = cap.get(2)?.as_str().to_lowercase();
        let confirm = matches!(word.as_str(), "确认" | "confirm" | "yes");
        Some((n, confirm))
      })
      .collect();

    if !matches.is_empty() {
      return FastPathResult::Batch(matches);
    }

    let lower = message.to_lowercase();
    let has_affirmative = AFFIRMATIVE_KEYWORDS.iter().any(|k| lower.contains(k));
    let has_negative = NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k));

    if has_affirmative && !has_negative {
      return FastPathResult::BlanketConfirm;
    }
    if has_negative && !has_affirmative {
      return FastPathResult::BlanketDeny;
    }
    FastPathResult::NoMatch
  }
}

/// Apply a fast-path parse result to `session`, indexing into `pending`
/// (the phenomena from the most recent recommendation, in order). Returns
/// whether anything matched, so the caller can decide whether to fall
/// through to the LLM slow path.
fn apply_fast_path(session: &mut SessionState, pending: &[String], result: &fast_path::FastPathResult) -> bool {
  match result {
    fast_path::FastPathResult::Batch(entries) => {
      let mut matched = false;
      for &(n, confirm) in entries {
        // 1-based index into the pending list; out-of-range indices are ignored.
        let Some(phenomenon_id) = n.checked_sub(1).and_then(|i| pending.get(i)) else { continue };
        matched = true;
        if confirm {
          session.confirm_phenomenon(phenomenon_id, "confirmed via fast path".to_owned());
        } else {
          session.deny_phenomenon(phenomenon_id);
        }
      }
      matched
    }
    fast_path::FastPathResult::BlanketConfirm => {
      for phenomenon_id in pending.to_vec() {
        session.confirm_phenomenon(&phenomenon_id, "confirmed via blanket fast path".to_owned());
      }
      !pending.is_empty()
    }
    fast_path::FastPathResult::BlanketDeny => {
      for phenomenon_id in pending.to_vec() {
        session.deny_phenomenon(&phenomenon_id);
      }
      !pending.is_empty()
    }
    fast_path::FastPathResult::NoMatch => false,
  }
}

fn apply_extraction(session: &mut SessionState, extraction: FeedbackExtraction) {
  for (phenomenon_id, value) in extraction.feedback {
    match value {
      FeedbackValue::Confirmed => session.confirm_phenomenon(&phenomenon_id, "confirmed via LLM extraction".to_owned()),
      FeedbackValue::Denied => session.deny_phenomenon(&phenomenon_id),
      FeedbackValue::Unknown => {}
    }
  }
  session.new_observations = extraction.new_observations;
}

/// The two seams that distinguish GAR from Hyb: how the initial candidate
/// pool is expanded, whether the slow path always runs, and how any new
/// free-text observations feed back into the candidate pool.
#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
  async fn expand_initial<L: Llm>(
    &self,
    llm: &L,
    session: &mut SessionState,
    db: &DatabaseConnection,
  ) -> Result<(), AppError>;

  fn wants_llm_slow_path(&self, fast_path_matched: bool) -> bool;

  async fn expand_after_feedback<L: Llm>(
    &self,
    llm: &L,
    session: &mut SessionState,
    db: &DatabaseConnection,
  ) -> Result<(), AppError>;
}

/// Deterministic path: only the standardized graph, fast-path parsing with
/// an LLM fallback solely when the fast path cannot parse the reply.
pub struct Gar;

#[async_trait::async_trait]
impl Strategy for Gar {
  async fn expand_initial<L: Llm>(&self, _llm: &L, _session: &mut SessionState, _db: &DatabaseConnection) -> Result<(), AppError> {
    Ok(())
  }

  fn wants_llm_slow_path(&self, fast_path_matched: bool) -> bool {
    !fast_path_matched
  }

  async fn expand_after_feedback<L: Llm>(&self, _llm: &L, _session: &mut SessionState, _db: &DatabaseConnection) -> Result<(), AppError> {
    Ok(())
  }
}

/// GAR plus ticket-description semantic retrieval and always-on LLM
/// feedback parsing, so free-form observations are never missed.
pub struct Hyb;

async fn expand_via_ticket_search<L: Llm>(
  llm: &L,
  query: &str,
  session: &mut SessionState,
  db: &DatabaseConnection,
) -> Result<(), AppError> {
  let ticket_ids = retriever::search_by_ticket_description(llm, query, 5, db).await?;
  let phenomena = retriever::get_phenomena_by_ticket_ids(&ticket_ids, db).await?;
  for p in phenomena {
    if !session.hybrid_candidate_phenomenon_ids.contains(&p.id) {
      session.hybrid_candidate_phenomenon_ids.push(p.id);
    }
  }
  Ok(())
}

#[async_trait::async_trait]
impl Strategy for Hyb {
  async fn expand_initial<L: Llm>(&self, llm: &L, session: &mut SessionState, db: &DatabaseConnection) -> Result<(), AppError> {
    let query = session.user_problem.clone();
    expand_via_ticket_search(llm, &query, session, db).await
  }

  fn wants_llm_slow_path(&self, _fast_path_matched: bool) -> bool {
    true
  }

  async fn expand_after_feedback<L: Llm>(&self, llm: &L, session: &mut SessionState, db: &DatabaseConnection) -> Result<(), AppError> {
    if session.new_observations.is_empty() {
      return Ok(());
    }
    let query = session.new_observations.join("; ");
    expand_via_ticket_search(llm, &query, session, db).await
  }
}

/// `DialogueManager<L, S>`: the one turn loop, generic over the LLM
/// implementation and the GAR/Hyb strategy.
pub struct DialogueManager<L: Llm, S: Strategy> {
  pub llm: L,
  pub strategy: S,
  pub cfg: Config,
}

impl<L: Llm, S: Strategy> DialogueManager<L, S> {
  #[must_use]
  pub const fn new(llm: L, strategy: S, cfg: Config) -> Self {
    Self { llm, strategy, cfg }
  }

  pub async fn start_conversation(
    &self,
    user_problem: String,
    db: &DatabaseConnection,
  ) -> Result<(String, Response), AppError> {
    let session_id = Uuid::new_v4().to_string();
    let result = session::run_turn(&session_id, db, self.cfg.turn_budget_secs, |mut sess| async move {
      sess.user_problem = user_problem.clone();
      sess.push_turn("user", user_problem.clone());

      self.strategy.expand_initial(&self.llm, &mut sess, db).await?;
      sess.active_hypotheses = crate::hypothesis::compute_active_hypotheses(&self.llm, &sess, db).await?;

      let response = self.apply_decision(&mut sess, db).await?;
      sess.push_turn("assistant", response_text(&response));
      Ok((sess, response))
    })
    .await;

    let response = match result {
      Ok(response) => response,
      Err(err) => fatal_error_response(err)?,
    };

    Ok((session_id, response))
  }

  pub async fn continue_conversation(
    &self,
    session_id: &str,
    user_message: String,
    db: &DatabaseConnection,
  ) -> Result<Response, AppError> {
    let result = session::run_turn(session_id, db, self.cfg.turn_budget_secs, |mut sess| async move {
      sess.push_turn("user", user_message.clone());

      let pending = sess.last_recommended();
      let fast_result = fast_path::parse(&user_message);
      let fast_matched = apply_fast_path(&mut sess, &pending, &fast_result);

      if self.strategy.wants_llm_slow_path(fast_matched) {
        if let Some(extraction) = self.slow_path_extract(&pending, db, &user_message).await? {
          apply_extraction(&mut sess, extraction);
        }
      }

      self.strategy.expand_after_feedback(&self.llm, &mut sess, db).await?;
      sess.active_hypotheses = crate::hypothesis::compute_active_hypotheses(&self.llm, &sess, db).await?;

      let response = self.apply_decision(&mut sess, db).await?;
      sess.push_turn("assistant", response_text(&response));
      Ok((sess, response))
    })
    .await;

    match result {
      Ok(response) => Ok(response),
      Err(err) => fatal_error_response(err),
    }
  }

  async fn apply_decision(&self, sess: &mut SessionState, db: &DatabaseConnection) -> Result<Response, AppError> {
    match recommender::decide(&self.cfg, sess, db).await? {
      Decision::AskInitialInfo => Ok(Response::AskInitialInfo),
      Decision::AskMoreInfo => Ok(Response::AskMoreInfo { active_hypotheses: sess.active_hypotheses.clone() }),
      Decision::Recommend(items) => {
        let turn = sess.recommended_phenomena.iter().map(|r| r.turn).max().map_or(1, |t| t + 1);
        let mut views = Vec::with_capacity(items.len());
        for item in items {
          sess.record_recommendation(&item.phenomenon_id, turn);
          views.push(RecommendedPhenomenonView {
            phenomenon_id: item.phenomenon_id,
            description: item.description,
            observation_method: item.observation_method,
            reason: item.reason,
          });
        }
        Ok(Response::Recommend { phenomena: views, active_hypotheses: sess.active_hypotheses.clone() })
      }
      Decision::Diagnosis => {
        let Some(top) = sess.active_hypotheses.first().cloned() else {
          return Ok(Response::AskInitialInfo);
        };
        let summary = response_generator::generate(&self.llm, self.cfg.max_retries, sess, &top, db).await?;
        Ok(Response::Diagnosis {
          root_cause_id: top.root_cause_id,
          confidence: top.confidence,
          summary,
          cited_tickets: top.supporting_ticket_ids,
        })
      }
    }
  }

  /// Schema-constrained extraction for the phenomena pending from the last
  /// recommendation. Retries once with a repair prompt on schema violation
  /// (§7 "permanent upstream" policy); a transient-upstream error instead
  /// propagates so the turn is not silently advanced.
  async fn slow_path_extract(
    &self,
    pending: &[String],
    db: &DatabaseConnection,
    message: &str,
  ) -> Result<Option<FeedbackExtraction>, AppError> {
    if pending.is_empty() {
      return Ok(None);
    }

    let mut descriptions = Vec::with_capacity(pending.len());
    for id in pending {
      if let Some(p) = knowledge_store::phenomenon_by_id(id, db).await? {
        descriptions.push(format!("- {}: {}", p.id, p.description));
      }
    }
    let phenomena_list = descriptions.join("\n");

    let system = format!(
      "Extract which of these pending phenomena the user confirmed or denied, and note any \
       distinct technical observation they mentioned that is not already in the list.\n\
       Pending phenomena:\n{phenomena_list}"
    );

    let build_messages = |system: &str| {
      vec![
        ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(system)),
        ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(message)),
      ]
    };

    let first = self
      .llm
      .generate_object::<FeedbackExtraction>(
        build_messages(&system),
        "feedback_extraction".to_owned(),
        Some("Structured confirm/deny feedback plus new free-text observations".to_owned()),
      )
      .await;

    match first {
      Ok(v) => Ok(Some(v)),
      Err(err) if err.kind() == ErrorKind::TransientUpstream => Err(err),
      Err(_) => {
        let repair_system = format!(
          "{system}\n\nYour previous response did not match the required JSON schema. \
           Respond again, strictly matching it."
        );
        match self
          .llm
          .generate_object::<FeedbackExtraction>(
            build_messages(&repair_system),
            "feedback_extraction".to_owned(),
            Some("Structured confirm/deny feedback plus new free-text observations".to_owned()),
          )
          .await
        {
          Ok(v) => Ok(Some(v)),
          Err(err) if err.kind() == ErrorKind::TransientUpstream => Err(err),
          // Permanent upstream failure after the repair retry: fall back to
          // whatever the fast path already resolved (possibly nothing).
          Err(_) => Ok(None),
        }
      }
    }
  }
}

/// Retrieval-augmented reasoning: pure LLM end-to-end over raw tickets, no
/// standardized graph. Interface-compatible with `DialogueManager` but a
/// separate type, per the re-architecture note — its internals aren't core.
pub struct Rar<L: Llm> {
  pub llm: L,
  pub cfg: Config,
}

impl<L: Llm> Rar<L> {
  #[must_use]
  pub const fn new(llm: L, cfg: Config) -> Self {
    Self { llm, cfg }
  }

  pub async fn start_conversation(
    &self,
    user_problem: String,
    db: &DatabaseConnection,
  ) -> Result<(String, Response), AppError> {
    let session_id = Uuid::new_v4().to_string();
    let result = session::run_turn(&session_id, db, self.cfg.turn_budget_secs, |mut sess| async move {
      sess.user_problem = user_problem.clone();
      sess.push_turn("user", user_problem.clone());
      let response = self.diagnose(&user_problem, db).await?;
      sess.push_turn("assistant", response_text(&response));
      Ok((sess, response))
    })
    .await;

    let response = match result {
      Ok(response) => response,
      Err(err) => fatal_error_response(err)?,
    };
    Ok((session_id, response))
  }

  pub async fn continue_conversation(
    &self,
    session_id: &str,
    user_message: String,
    db: &DatabaseConnection,
  ) -> Result<Response, AppError> {
    let result = session::run_turn(session_id, db, self.cfg.turn_budget_secs, |mut sess| async move {
      sess.push_turn("user", user_message.clone());
      let combined = format!("{}\n{}", sess.user_problem, user_message);
      let response = self.diagnose(&combined, db).await?;
      sess.push_turn("assistant", response_text(&response));
      Ok((sess, response))
    })
    .await;

    match result {
      Ok(response) => Ok(response),
      Err(err) => fatal_error_response(err),
    }
  }

  async fn diagnose(&self, query: &str, db: &DatabaseConnection) -> Result<Response, AppError> {
    let tickets = knowledge_store::all_raw_tickets(db).await?;
    if tickets.is_empty() {
      return Ok(Response::AskInitialInfo);
    }

    let allowed_ids: Vec<String> = tickets.iter().map(|t| t.ticket_id.clone()).collect();
    let context: String = tickets
      .iter()
      .map(|t| format!("[{}] {}\nRoot cause: {}\nSolution: {}", t.ticket_id, t.description, t.root_cause_text, t.solution))
      .collect::<Vec<_>>()
      .join("\n\n");

    const SYSTEM: &str = "\
You are a database-incident diagnosis assistant reasoning directly over a \
corpus of historical tickets, with no precomputed knowledge graph. Diagnose \
the operator's problem in Markdown, citing only ticket ids present in the \
corpus you were given.";

    let user = format!("Problem: {query}\n\nHistorical tickets:\n{context}");

    let raw = with_backoff(self.cfg.max_retries, || async {
      self
        .llm
        .generate_text(vec![
          ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(SYSTEM)),
          ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(user.clone())),
        ])
        .await
    })
    .await?;

    let filtered = response_generator::post_filter_citations(&raw, &allowed_ids);
    Ok(Response::Diagnosis {
      root_cause_id: String::new(),
      confidence: 0.0,
      summary: filtered,
      cited_tickets: allowed_ids,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fast_path_parses_mixed_confirm_deny() {
    let result = fast_path::parse("1确认 2确认 3否定");
    let fast_path::FastPathResult::Batch(entries) = result else { panic!("expected batch match") };
    assert_eq!(entries, vec![(1, true), (2, true), (3, false)]);
  }

  #[test]
  fn fast_path_ignores_out_of_range_index() {
    let pending = vec!["P-0001".to_owned(), "P-0002".to_owned(), "P-0003".to_owned()];
    let mut session = SessionState::new("s1".to_owned(), "problem".to_owned());
    let result = fast_path::parse("5确认");
    apply_fast_path(&mut session, &pending, &result);
    assert!(session.confirmed_phenomena.is_empty());
    assert!(session.denied_phenomena.is_empty());
  }

  #[test]
  fn fast_path_blanket_confirm_applies_to_all_pending() {
    let pending = vec!["P-0001".to_owned(), "P-0002".to_owned()];
    let mut session = SessionState::new("s1".to_owned(), "problem".to_owned());
    let result = fast_path::parse("yes, confirm all");
    let matched = apply_fast_path(&mut session, &pending, &result);
    assert!(matched);
    assert_eq!(session.confirmed_phenomena.len(), 2);
  }
}
