//! Confidence computation: given the current session state, produce the
//! top-K candidate root causes. Stateless — reads the session and the
//! corpus, returns a fresh list every turn; nothing here is incrementally
//! mutated across turns.

use std::collections::HashSet;

use dbdiag_shared::AppError;
use sea_orm::DatabaseConnection;

use crate::knowledge_store;
use crate::llm::Llm;
use crate::retriever;
use crate::session::SessionState;

const TOP_K: usize = 3;
const RETRIEVE_TOP_K: usize = 20;
const SUPPORTING_PHENOMENA_NORMALIZER: f32 = 5.0;
const DENY_PENALTY_PER_PHENOMENON: f32 = 0.15;
const DENY_PENALTY_CEILING: f32 = 0.9;

/// Gather the candidate root-cause id set for this turn: root causes tied
/// (via `PhenomenonRootCause`) to any confirmed phenomenon, to any
/// phenomenon the retriever surfaces for `session.user_problem`, and —
/// when `hybrid_candidate_phenomenon_ids` is nonempty (Hyb mode) — to any
/// phenomenon in that set.
async fn gather_candidate_root_causes<L: Llm>(
  llm: &L,
  session: &SessionState,
  db: &DatabaseConnection,
) -> Result<HashSet<String>, AppError> {
  let mut phenomenon_ids: HashSet<String> = session
    .confirmed_phenomena
    .iter()
    .map(|c| c.phenomenon_id.clone())
    .collect();

  let excluded: HashSet<String> = session.denied_phenomena.iter().map(|d| d.phenomenon_id.clone()).collect();
  let retrieved = retriever::retrieve(llm, &session.user_problem, RETRIEVE_TOP_K, &excluded, db).await?;
  phenomenon_ids.extend(retrieved.into_iter().map(|r| r.phenomenon.id));

  phenomenon_ids.extend(session.hybrid_candidate_phenomenon_ids.iter().cloned());

  if phenomenon_ids.is_empty() {
    return Ok(HashSet::new());
  }

  let ids: Vec<String> = phenomenon_ids.into_iter().collect();
  let links = knowledge_store::root_causes_for_phenomena(&ids, db).await?;
  Ok(links.into_iter().map(|l| l.root_cause_id).collect())
}

/// Compute confidence for one candidate root cause per the weighted
/// progress/frequency/relevance formula, with a deny penalty applied
/// multiplicatively.
fn score_candidate(
  session: &SessionState,
  r_p: &HashSet<String>,
) -> (f32, usize) {
  let confirmed: HashSet<&str> = session.confirmed_phenomena.iter().map(|c| c.phenomenon_id.as_str()).collect();
  let denied: HashSet<&str> = session.denied_phenomena.iter().map(|d| d.phenomenon_id.as_str()).collect();

  let confirmed_relevant = r_p.iter().filter(|p| confirmed.contains(p.as_str())).count();
  let denied_relevant = r_p.iter().filter(|p| denied.contains(p.as_str())).count();

  let progress = confirmed_relevant as f32 / r_p.len().max(1) as f32;
  let supporting_phenomena = confirmed_relevant + denied_relevant;
  let frequency = (supporting_phenomena as f32 / SUPPORTING_PHENOMENA_NORMALIZER).min(1.0);
  let relevance = if confirmed_relevant > 0 { 1.0 } else { 0.5 };

  let base = 0.6 * progress + 0.2 * frequency + 0.2 * relevance;
  let penalty = (denied_relevant as f32 * DENY_PENALTY_PER_PHENOMENON).min(DENY_PENALTY_CEILING);
  let confidence = (base * (1.0 - penalty)).clamp(0.0, 1.0);

  (confidence, confirmed_relevant)
}

pub async fn compute_active_hypotheses<L: Llm>(
  llm: &L,
  session: &SessionState,
  db: &DatabaseConnection,
) -> Result<Vec<crate::session::Hypothesis>, AppError> {
  let candidate_ids = gather_candidate_root_causes(llm, session, db).await?;
  if candidate_ids.is_empty() {
    return Ok(Vec::new());
  }

  let mut hypotheses = Vec::with_capacity(candidate_ids.len());
  let confirmed: HashSet<&str> = session.confirmed_phenomena.iter().map(|c| c.phenomenon_id.as_str()).collect();
  let denied: HashSet<&str> = session.denied_phenomena.iter().map(|d| d.phenomenon_id.as_str()).collect();

  for rc_id in candidate_ids {
    let Some(rc) = knowledge_store::root_cause_by_id(&rc_id, db).await? else { continue };
    let links = knowledge_store::phenomena_for_root_cause(&rc_id, db).await?;
    let r_p: HashSet<String> = links.iter().map(|l| l.phenomenon_id.clone()).collect();

    let (confidence, _) = score_candidate(session, &r_p);

    let supporting_phenomenon_ids: Vec<String> =
      r_p.iter().filter(|p| confirmed.contains(p.as_str())).cloned().collect();

    let mut supporting_ticket_ids = Vec::new();
    for phenomenon_id in &supporting_phenomenon_ids {
      supporting_ticket_ids.extend(knowledge_store::supporting_tickets(phenomenon_id, &rc_id, db).await?);
    }
    supporting_ticket_ids.sort();
    supporting_ticket_ids.dedup();

    let missing_phenomena: Vec<String> = r_p
      .iter()
      .filter(|p| !confirmed.contains(p.as_str()) && !denied.contains(p.as_str()))
      .cloned()
      .collect();

    let mut associated_phenomenon_ids: Vec<String> = r_p.iter().cloned().collect();
    associated_phenomenon_ids.sort();

    hypotheses.push(crate::session::Hypothesis {
      root_cause_id: rc.id,
      root_cause_description: rc.description,
      confidence,
      supporting_phenomenon_ids,
      supporting_ticket_ids,
      missing_phenomena,
      associated_phenomenon_ids,
    });
  }

  hypotheses.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  hypotheses.truncate(TOP_K);
  Ok(hypotheses)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::{ConfirmedPhenomenon, DeniedPhenomenon};

  fn session_with(confirmed: &[&str], denied: &[&str]) -> SessionState {
    let mut sess = SessionState::new("s1".to_owned(), "problem".to_owned());
    sess.confirmed_phenomena = confirmed
      .iter()
      .map(|id| ConfirmedPhenomenon { phenomenon_id: (*id).to_owned(), result_summary: String::new(), timestamp: chrono::Utc::now() })
      .collect();
    sess.denied_phenomena = denied
      .iter()
      .map(|id| DeniedPhenomenon { phenomenon_id: (*id).to_owned(), timestamp: chrono::Utc::now() })
      .collect();
    sess
  }

  #[test]
  fn confidence_rises_with_confirmed_progress() {
    let r_p: HashSet<String> = ["P-0001", "P-0002"].iter().map(|s| (*s).to_owned()).collect();

    let (none_confirmed, _) = score_candidate(&session_with(&[], &[]), &r_p);
    let (one_confirmed, _) = score_candidate(&session_with(&["P-0001"], &[]), &r_p);
    let (both_confirmed, _) = score_candidate(&session_with(&["P-0001", "P-0002"], &[]), &r_p);

    assert!(one_confirmed > none_confirmed);
    assert!(both_confirmed > one_confirmed);
  }

  #[test]
  fn deny_penalty_reduces_confidence_below_confirmed_only() {
    let r_p: HashSet<String> = ["P-0001", "P-0002", "P-0003"].iter().map(|s| (*s).to_owned()).collect();

    let (confirmed_only, _) = score_candidate(&session_with(&["P-0001"], &[]), &r_p);
    let (confirmed_and_denied, _) = score_candidate(&session_with(&["P-0001"], &["P-0002"]), &r_p);

    // progress/relevance are unchanged by the denial (still 1 confirmed-of-3,
    // still some confirmed), but the multiplicative deny penalty still drags
    // the overall confidence down.
    assert!(confirmed_and_denied < confirmed_only);
  }

  #[test]
  fn confidence_is_clamped_to_unit_interval() {
    let r_p: HashSet<String> = ["P-0001"].iter().map(|s| (*s).to_owned()).collect();
    let (confidence, _) = score_candidate(&session_with(&["P-0001"], &[]), &r_p);
    assert!((0.0..=1.0).contains(&confidence));
  }
}
