//! Per-conversation working memory: `SessionState`/`Hypothesis`, persisted
//! as one JSON blob per turn with row-level locking so two turns on the
//! same session never interleave.

use chrono::{DateTime, Utc};
use dbdiag_entities::session;
use dbdiag_shared::AppError;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, TransactionTrait};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedPhenomenon {
  pub phenomenon_id: String,
  pub result_summary: String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeniedPhenomenon {
  pub phenomenon_id: String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedPhenomenon {
  pub phenomenon_id: String,
  pub turn: u32,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
  pub role: String,
  pub content: String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
  pub root_cause_id: String,
  pub root_cause_description: String,
  pub confidence: f32,
  pub supporting_phenomenon_ids: Vec<String>,
  pub supporting_ticket_ids: Vec<String>,
  pub missing_phenomena: Vec<String>,
  /// The full `R_p` set this root cause is linked to — confirmed, denied,
  /// and unresolved phenomena alike. `supporting_phenomenon_ids` and
  /// `missing_phenomena` each carry only part of it (denied phenomena are
  /// in neither), so anything computing a fraction of "all of `R_p`" needs
  /// this, not their sum.
  #[serde(default)]
  pub associated_phenomenon_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
  pub session_id: String,
  pub user_problem: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub confirmed_phenomena: Vec<ConfirmedPhenomenon>,
  #[serde(default)]
  pub denied_phenomena: Vec<DeniedPhenomenon>,
  #[serde(default)]
  pub recommended_phenomena: Vec<RecommendedPhenomenon>,
  #[serde(default)]
  pub active_hypotheses: Vec<Hypothesis>,
  #[serde(default)]
  pub dialogue_history: Vec<DialogueTurn>,
  #[serde(default)]
  pub hybrid_candidate_phenomenon_ids: Vec<String>,
  #[serde(default)]
  pub new_observations: Vec<String>,
}

impl SessionState {
  #[must_use]
  pub fn new(session_id: String, user_problem: String) -> Self {
    Self {
      session_id,
      user_problem,
      created_at: Utc::now(),
      confirmed_phenomena: Vec::new(),
      denied_phenomena: Vec::new(),
      recommended_phenomena: Vec::new(),
      active_hypotheses: Vec::new(),
      dialogue_history: Vec::new(),
      hybrid_candidate_phenomenon_ids: Vec::new(),
      new_observations: Vec::new(),
    }
  }

  /// Confirm a phenomenon: removes any prior denial (deny supersedes a
  /// recommendation, but confirm always wins once the user states it).
  pub fn confirm_phenomenon(&mut self, phenomenon_id: &str, result_summary: String) {
    self.denied_phenomena.retain(|d| d.phenomenon_id != phenomenon_id);
    if self.confirmed_phenomena.iter().any(|c| c.phenomenon_id == phenomenon_id) {
      return;
    }
    self.confirmed_phenomena.push(ConfirmedPhenomenon {
      phenomenon_id: phenomenon_id.to_owned(),
      result_summary,
      timestamp: Utc::now(),
    });
  }

  /// Deny a phenomenon. No-op if already confirmed in this session — a
  /// confirmed phenomenon cannot later be denied without an explicit reset.
  pub fn deny_phenomenon(&mut self, phenomenon_id: &str) {
    if self.confirmed_phenomena.iter().any(|c| c.phenomenon_id == phenomenon_id) {
      return;
    }
    if self.denied_phenomena.iter().any(|d| d.phenomenon_id == phenomenon_id) {
      return;
    }
    self.denied_phenomena.push(DeniedPhenomenon {
      phenomenon_id: phenomenon_id.to_owned(),
      timestamp: Utc::now(),
    });
  }

  pub fn record_recommendation(&mut self, phenomenon_id: &str, turn: u32) {
    self.recommended_phenomena.push(RecommendedPhenomenon {
      phenomenon_id: phenomenon_id.to_owned(),
      turn,
      timestamp: Utc::now(),
    });
  }

  pub fn push_turn(&mut self, role: &str, content: String) {
    self.dialogue_history.push(DialogueTurn { role: role.to_owned(), content, timestamp: Utc::now() });
  }

  /// Phenomenon ids pending from the most recent `recommend` response, in
  /// the order they were recommended — the index set the fast-path parser's
  /// `(n, confirm|deny)` grammar refers into.
  #[must_use]
  pub fn last_recommended(&self) -> Vec<String> {
    let Some(last_turn) = self.recommended_phenomena.iter().map(|r| r.turn).max() else {
      return Vec::new();
    };
    self
      .recommended_phenomena
      .iter()
      .filter(|r| r.turn == last_turn)
      .map(|r| r.phenomenon_id.clone())
      .filter(|id| !self.is_resolved(id))
      .collect()
  }

  #[must_use]
  pub fn is_resolved(&self, phenomenon_id: &str) -> bool {
    self.confirmed_phenomena.iter().any(|c| c.phenomenon_id == phenomenon_id)
      || self.denied_phenomena.iter().any(|d| d.phenomenon_id == phenomenon_id)
  }
}

/// Load a session's state, creating a fresh one (not yet persisted) if none
/// exists for `session_id`.
pub async fn load_or_create(session_id: &str, db: &DatabaseConnection) -> Result<SessionState, AppError> {
  match session::Entity::find_by_id(session_id.to_owned()).one(db).await? {
    Some(row) => Ok(serde_json::from_value(row.blob).map_err(AppError::data_integrity)?),
    None => Ok(SessionState::new(session_id.to_owned(), String::new())),
  }
}

/// Run `turn` against the row-locked session, persisting its result only if
/// `turn` returns `Ok`. Mirrors the take-then-clear pattern used for the
/// per-conversation message queue: lock the row, run the whole turn inside
/// the same transaction, commit only on success so a failed turn leaves the
/// prior session blob untouched. The whole body is bounded by
/// `turn_budget_secs` (§5); a turn that exceeds it is cancelled mid-flight —
/// the transaction drops without committing, same as any other failure —
/// and reported as `ErrorKind::Capacity`.
pub async fn run_turn<F, Fut, T>(
  session_id: &str,
  db: &DatabaseConnection,
  turn_budget_secs: u64,
  turn: F,
) -> Result<T, AppError>
where
  F: FnOnce(SessionState) -> Fut,
  Fut: std::future::Future<Output = Result<(SessionState, T), AppError>>,
{
  let body = async {
    let txn = db.begin().await?;

    let state = match session::Entity::find_by_id(session_id.to_owned()).lock_exclusive().one(&txn).await? {
      Some(row) => serde_json::from_value(row.blob).map_err(AppError::data_integrity)?,
      None => SessionState::new(session_id.to_owned(), String::new()),
    };

    let (new_state, output) = turn(state).await?;

    let blob = serde_json::to_value(&new_state)?;
    let now = Utc::now().into();

    match session::Entity::find_by_id(session_id.to_owned()).one(&txn).await? {
      Some(existing) => {
        let mut active: session::ActiveModel = existing.into_active_model();
        active.blob = sea_orm::ActiveValue::Set(blob);
        active.updated_at = sea_orm::ActiveValue::Set(now);
        active.update(&txn).await?;
      }
      None => {
        let model = session::Model {
          session_id: session_id.to_owned(),
          blob,
          created_at: now,
          updated_at: now,
        };
        model.into_active_model().insert(&txn).await?;
      }
    }

    txn.commit().await?;
    Ok(output)
  };

  match tokio::time::timeout(std::time::Duration::from_secs(turn_budget_secs), body).await {
    Ok(result) => result,
    Err(_elapsed) => Err(AppError::capacity(anyhow::anyhow!("turn exceeded {turn_budget_secs}s budget"))),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn confirm_removes_prior_denial() {
    let mut sess = SessionState::new("s1".to_owned(), "problem".to_owned());
    sess.deny_phenomenon("P-0001");
    sess.confirm_phenomenon("P-0001", "looked fine after all".to_owned());
    assert!(sess.confirmed_phenomena.iter().any(|c| c.phenomenon_id == "P-0001"));
    assert!(sess.denied_phenomena.is_empty());
  }

  #[test]
  fn deny_is_noop_once_confirmed() {
    let mut sess = SessionState::new("s1".to_owned(), "problem".to_owned());
    sess.confirm_phenomenon("P-0001", "confirmed".to_owned());
    sess.deny_phenomenon("P-0001");
    assert!(sess.denied_phenomena.is_empty());
    assert_eq!(sess.confirmed_phenomena.len(), 1);
  }

  #[test]
  fn no_phenomenon_appears_in_both_confirmed_and_denied() {
    let mut sess = SessionState::new("s1".to_owned(), "problem".to_owned());
    sess.confirm_phenomenon("P-0001", "confirmed".to_owned());
    sess.deny_phenomenon("P-0002");
    sess.deny_phenomenon("P-0001");
    sess.confirm_phenomenon("P-0002", "confirmed".to_owned());

    let confirmed: HashSet<_> = sess.confirmed_phenomena.iter().map(|c| c.phenomenon_id.clone()).collect();
    let denied: HashSet<_> = sess.denied_phenomena.iter().map(|d| d.phenomenon_id.clone()).collect();
    assert!(confirmed.is_disjoint(&denied));
  }

  #[test]
  fn confirming_twice_does_not_duplicate() {
    let mut sess = SessionState::new("s1".to_owned(), "problem".to_owned());
    sess.confirm_phenomenon("P-0001", "first".to_owned());
    sess.confirm_phenomenon("P-0001", "second".to_owned());
    assert_eq!(sess.confirmed_phenomena.len(), 1);
  }

  #[test]
  fn last_recommended_only_returns_most_recent_turn_and_excludes_resolved() {
    let mut sess = SessionState::new("s1".to_owned(), "problem".to_owned());
    sess.record_recommendation("P-0001", 1);
    sess.record_recommendation("P-0002", 1);
    sess.record_recommendation("P-0003", 2);
    sess.record_recommendation("P-0004", 2);
    sess.deny_phenomenon("P-0004");

    let pending = sess.last_recommended();
    assert_eq!(pending, vec!["P-0003".to_owned()]);
  }
}
