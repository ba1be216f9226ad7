//! Decision policy and phenomenon scoring: given the hypotheses the tracker
//! just computed, decide whether to recommend more observations, commit to
//! a diagnosis, or ask for more information.

use std::collections::HashSet;

use dbdiag_shared::{AppError, Config};
use sea_orm::DatabaseConnection;

use crate::knowledge_store;
use crate::session::{Hypothesis, SessionState};

const TOP_N: usize = 3;

#[derive(Debug, Clone)]
pub struct RecommendedPhenomenon {
  pub phenomenon_id: String,
  pub description: String,
  pub observation_method: String,
  /// Human-readable note on which hypothesis this phenomenon most supports.
  pub reason: String,
  pub score: f32,
}

#[derive(Debug, Clone)]
pub enum Decision {
  Recommend(Vec<RecommendedPhenomenon>),
  Diagnosis,
  AskInitialInfo,
  AskMoreInfo,
}

/// `§4.4`'s top-level policy: empty hypotheses asks for initial info; a
/// confident top hypothesis is terminal; otherwise try to recommend more
/// observations, falling back to a forced moderate-confidence diagnosis or a
/// request for more information.
pub async fn decide(
  cfg: &Config,
  session: &SessionState,
  db: &DatabaseConnection,
) -> Result<Decision, AppError> {
  let Some(top) = session.active_hypotheses.first() else {
    return Ok(Decision::AskInitialInfo);
  };

  if top.confidence >= cfg.diagnosis_threshold {
    return Ok(Decision::Diagnosis);
  }

  let recommended = score_phenomena(session, db).await?;
  if !recommended.is_empty() {
    return Ok(Decision::Recommend(recommended));
  }

  if top.confidence >= cfg.forced_diagnosis_threshold {
    return Ok(Decision::Diagnosis);
  }

  Ok(Decision::AskMoreInfo)
}

/// Candidate phenomena: union of phenomena tied to any active hypothesis,
/// minus anything already confirmed or denied.
async fn candidate_phenomena(
  session: &SessionState,
  db: &DatabaseConnection,
) -> Result<Vec<(String, HashSet<usize>)>, AppError> {
  let resolved: HashSet<&str> = session
    .confirmed_phenomena
    .iter()
    .map(|c| c.phenomenon_id.as_str())
    .chain(session.denied_phenomena.iter().map(|d| d.phenomenon_id.as_str()))
    .collect();

  let mut supporters: std::collections::HashMap<String, HashSet<usize>> = std::collections::HashMap::new();
  for (rc_idx, rc) in session.active_hypotheses.iter().enumerate() {
    let links = knowledge_store::phenomena_for_root_cause(&rc.root_cause_id, db).await?;
    for link in links {
      if resolved.contains(link.phenomenon_id.as_str()) {
        continue;
      }
      supporters.entry(link.phenomenon_id).or_default().insert(rc_idx);
    }
  }

  Ok(supporters.into_iter().collect())
}

/// `score(p) = 0.15*popularity + 0.20*specificity + 0.40*hypothesis_priority + 0.25*information_gain`.
async fn score_phenomena(
  session: &SessionState,
  db: &DatabaseConnection,
) -> Result<Vec<RecommendedPhenomenon>, AppError> {
  let candidates = candidate_phenomena(session, db).await?;
  if candidates.is_empty() {
    return Ok(Vec::new());
  }

  let max_ticket_count = knowledge_store::max_ticket_count(db).await?.max(1) as f32;
  let hypotheses = &session.active_hypotheses;
  let top1 = hypotheses.first();
  let top2 = hypotheses.get(1);

  let mut scored = Vec::with_capacity(candidates.len());

  for (phenomenon_id, r_p) in candidates {
    let Some(phenomenon) = knowledge_store::phenomenon_by_id(&phenomenon_id, db).await? else { continue };
    let links = knowledge_store::root_causes_for_phenomena(&[phenomenon_id.clone()], db).await?;
    let ticket_count_for = |rc_id: &str| -> i32 {
      links.iter().find(|l| l.root_cause_id == rc_id).map_or(0, |l| l.ticket_count)
    };

    let popularity = links.iter().map(|l| l.ticket_count as f32 / max_ticket_count).fold(0.0_f32, f32::max);
    let specificity = 1.0 / r_p.len().max(1) as f32;

    let mut hypothesis_priority = 0.0_f32;
    let mut best_rc_idx = None;
    for &rc_idx in &r_p {
      let rc = &hypotheses[rc_idx];
      let tc = ticket_count_for(&rc.root_cause_id) as f32;
      let priority = rc.confidence * (0.7 + 0.3 * (tc / max_ticket_count).sqrt());
      if priority > hypothesis_priority || best_rc_idx.is_none() {
        hypothesis_priority = priority;
        best_rc_idx = Some(rc_idx);
      }
    }

    let confirmation_gain = top1
      .filter(|top| r_p.contains(&0))
      .map(|top| {
        // `associated_phenomenon_ids` is the full `R_top` set — unlike
        // `supporting_phenomenon_ids` + `missing_phenomena`, it still
        // counts phenomena of `top` that were denied.
        let phenomena_of_top = top.associated_phenomenon_ids.len();
        1.0 - top.supporting_phenomenon_ids.len() as f32 / phenomena_of_top.max(1) as f32
      })
      .unwrap_or(0.0);

    let discrimination_power = match (top1, top2) {
      (Some(_), Some(_)) => {
        let in1 = r_p.contains(&0);
        let in2 = r_p.contains(&1);
        match (in1, in2) {
          (true, false) => 1.0,
          (false, true) => 0.8,
          (true, true) => 0.2,
          (false, false) => 0.1,
        }
      }
      _ => 0.0,
    };

    let information_gain = 0.6 * confirmation_gain + 0.4 * discrimination_power;
    let score = 0.15 * popularity + 0.20 * specificity + 0.40 * hypothesis_priority + 0.25 * information_gain;

    let reason = best_rc_idx
      .map(|idx| format!("most supports hypothesis \"{}\"", hypotheses[idx].root_cause_description))
      .unwrap_or_default();

    scored.push(RecommendedPhenomenon {
      phenomenon_id,
      description: phenomenon.description,
      observation_method: phenomenon.observation_method,
      reason,
      score,
    });
  }

  scored.sort_by(|a, b| b.score.total_cmp(&a.score));
  scored.truncate(TOP_N);
  Ok(scored)
}

#[must_use]
pub fn hypotheses_summary(hypotheses: &[Hypothesis]) -> String {
  hypotheses
    .iter()
    .map(|h| format!("{} ({:.2})", h.root_cause_description, h.confidence))
    .collect::<Vec<_>>()
    .join("; ")
}
