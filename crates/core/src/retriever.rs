//! Free-text retrieval over the standardized knowledge graph: phenomenon
//! search (keyword-filtered, vector+novelty reranked) and ticket-description
//! search (plain nearest-neighbor, ported close to the teacher's hybrid
//! retrieval shape since that leg is a single ranked query).

use std::collections::HashSet;

use dbdiag_ai::cosine_similarity;
use dbdiag_entities::{phenomenon, raw_ticket};
use dbdiag_shared::AppError;
use sea_orm::DatabaseConnection;

use crate::knowledge_store;
use crate::llm::Llm;

const VECTOR_CANDIDATE_LIMIT: usize = 50;

const STOP_WORDS: &[&str] = &[
  "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "to", "of", "in", "on", "at",
  "for", "with", "by", "from", "and", "or", "but", "not", "no", "it", "its", "this", "that", "these",
  "those", "as", "we", "our", "has", "have", "had", "do", "does", "did", "can", "could", "will",
  "would", "should", "than", "then", "there", "here", "when", "why", "how", "what", "which", "who",
];

#[derive(Debug, Clone)]
pub struct ScoredPhenomenon {
  pub phenomenon: phenomenon::Model,
  pub score: f32,
}

/// Lowercase, split on non-alphanumerics, drop stop-words and single chars.
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
  text
    .to_lowercase()
    .split(|c: char| !c.is_alphanumeric())
    .filter(|tok| tok.chars().count() >= 2)
    .filter(|tok| !STOP_WORDS.contains(tok))
    .map(str::to_owned)
    .collect()
}

fn phenomenon_tokens(p: &phenomenon::Model) -> HashSet<String> {
  tokenize(&format!("{} {}", p.description, p.observation_method))
}

/// `retrieve(query, top_k, excluded_ids)`: vector-candidate → keyword-filter
/// → rerank `0.5*fact_coverage + 0.3*vector_sim + 0.2*novelty`.
pub async fn retrieve<L: Llm>(
  llm: &L,
  query: &str,
  top_k: usize,
  excluded_ids: &HashSet<String>,
  db: &DatabaseConnection,
) -> Result<Vec<ScoredPhenomenon>, AppError> {
  let all = knowledge_store::all_phenomena(db).await?;
  if all.is_empty() {
    return Ok(Vec::new());
  }

  let query_embedding = llm.embed(query).await?;
  let query_tokens = tokenize(query);

  let mut by_vector: Vec<(phenomenon::Model, f32)> = all
    .into_iter()
    .map(|p| {
      let sim = cosine_similarity(&query_embedding, p.embedding.as_slice());
      (p, sim)
    })
    .collect();
  by_vector.sort_by(|a, b| b.1.total_cmp(&a.1));
  by_vector.truncate(VECTOR_CANDIDATE_LIMIT);

  let with_hits: Vec<(phenomenon::Model, f32, usize)> = by_vector
    .into_iter()
    .map(|(p, vector_sim)| {
      let hits = query_tokens.intersection(&phenomenon_tokens(&p)).count();
      (p, vector_sim, hits)
    })
    .collect();

  let survivors_have_hits = with_hits.iter().filter(|(_, _, hits)| *hits >= 1).count();
  let filtered: Vec<(phenomenon::Model, f32, usize)> = if survivors_have_hits >= top_k {
    with_hits.into_iter().filter(|(_, _, hits)| *hits >= 1).collect()
  } else {
    with_hits
  };

  let query_token_count = query_tokens.len().max(1) as f32;

  let mut scored: Vec<ScoredPhenomenon> = filtered
    .into_iter()
    .map(|(p, vector_sim, hits)| {
      let fact_coverage = hits as f32 / query_token_count;
      let novelty = if excluded_ids.contains(&p.id) { 0.3 } else { 1.0 };
      let final_score = 0.5 * fact_coverage + 0.3 * vector_sim + 0.2 * novelty;
      ScoredPhenomenon { phenomenon: p, score: final_score }
    })
    .collect();

  scored.sort_by(|a, b| b.score.total_cmp(&a.score));
  scored.truncate(top_k);

  Ok(scored)
}

/// `search_by_ticket_description(query, top_k)`: nearest raw tickets by
/// description embedding. Embeddings are computed on demand rather than
/// persisted, since no ticket-embedding column exists in the standardized
/// schema.
pub async fn search_by_ticket_description<L: Llm>(
  llm: &L,
  query: &str,
  top_k: usize,
  db: &DatabaseConnection,
) -> Result<Vec<String>, AppError> {
  let tickets = knowledge_store::all_raw_tickets(db).await?;
  if tickets.is_empty() {
    return Ok(Vec::new());
  }

  let query_embedding = llm.embed(query).await?;
  let descriptions: Vec<String> = tickets.iter().map(|t| t.description.clone()).collect();
  let embeddings = llm.embed_many(&descriptions).await?;

  let mut scored: Vec<(&raw_ticket::Model, f32)> = tickets
    .iter()
    .zip(embeddings.iter())
    .map(|(t, e)| (t, cosine_similarity(&query_embedding, e)))
    .collect();
  scored.sort_by(|a, b| b.1.total_cmp(&a.1));
  scored.truncate(top_k);

  Ok(scored.into_iter().map(|(t, _)| t.ticket_id.clone()).collect())
}

/// `get_phenomena_by_ticket_ids`: thin re-export of the knowledge-store
/// union-and-dedup accessor, kept here so dialogue code only imports from
/// `retriever` for its three retrieval operations.
pub async fn get_phenomena_by_ticket_ids(
  ticket_ids: &[String],
  db: &DatabaseConnection,
) -> Result<Vec<phenomenon::Model>, AppError> {
  knowledge_store::phenomena_by_ticket_ids(ticket_ids, db).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokenize_drops_stop_words_and_short_tokens() {
    let tokens = tokenize("The CPU is at a high utilization and it was not responding");
    assert!(tokens.contains("cpu"));
    assert!(tokens.contains("responding"));
    assert!(tokens.contains("utilization"));
    assert!(!tokens.contains("the"));
    assert!(!tokens.contains("is"));
    assert!(!tokens.contains("a"));
  }

  #[test]
  fn tokenize_lowercases() {
    let tokens = tokenize("Connection Pool Exhausted");
    assert!(tokens.contains("connection"));
    assert!(tokens.contains("pool"));
    assert!(tokens.contains("exhausted"));
  }
}
