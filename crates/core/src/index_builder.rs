//! Offline rebuild pipeline: embed anomalies and root-cause texts,
//! greedy-cluster by cosine similarity, LLM-canonicalize each cluster,
//! and atomically repopulate the standardized tables.

use std::collections::HashMap;

use dbdiag_ai::{ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage};
use dbdiag_entities::{phenomenon, phenomenon_root_cause, raw_anomaly, raw_ticket, root_cause, ticket, ticket_phenomenon};
use dbdiag_shared::{AppError, retry::with_backoff};
use sea_orm::{
  ActiveModelTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait, IntoActiveModel,
  Statement, TransactionTrait, prelude::PgVector,
};

use crate::cluster::{Cluster, greedy_cluster};
use crate::knowledge_store;
use crate::llm::Llm;

const MERGE_SYSTEM_PROMPT: &str = "\
You canonicalize database-incident descriptions into a single, precise \
sentence for a knowledge base. Preserve the key metric involved, but \
remove specific numeric thresholds (write \"exceeds threshold\" instead of \
\"65%\"). Respond with exactly one sentence and nothing else.";

const MERGE_SOLUTION_SYSTEM_PROMPT: &str = "\
You merge several remediation write-ups for the same root cause into one \
solution. Deduplicate steps that describe the same action, but preserve \
every distinct remediation action mentioned by any source. Respond with \
the merged solution text only.";

#[derive(Debug, Default)]
pub struct RebuildReport {
  pub phenomena: usize,
  pub root_causes: usize,
  pub ticket_phenomenon_links: usize,
  pub phenomenon_root_cause_links: usize,
}

struct PhenomenonDraft {
  description: String,
  observation_method: String,
  source_anomaly_ids: Vec<String>,
  cluster_size: i32,
  embedding: Vec<f32>,
}

struct RootCauseDraft {
  description: String,
  solution: String,
  source_raw_root_cause_ids: Vec<String>,
  cluster_size: i32,
  ticket_count: i32,
  embedding: Vec<f32>,
  /// Exact `root_cause_text` values folded into this cluster, used to
  /// resolve each `RawTicket` back to its assigned root cause.
  source_texts: Vec<String>,
}

async fn llm_chat<L: Llm>(llm: &L, max_retries: u32, system: &str, user: String) -> Result<String, AppError> {
  with_backoff(max_retries, || async {
    llm
      .generate_text(vec![
        ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(system)),
        ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(user.clone())),
      ])
      .await
  })
  .await
}

async fn build_phenomena<L: Llm>(
  llm: &L,
  max_retries: u32,
  cluster_threshold: f32,
  db: &DatabaseConnection,
) -> Result<(Vec<PhenomenonDraft>, HashMap<String, usize>), AppError> {
  let mut anomalies = knowledge_store::all_raw_anomalies(db).await?;
  anomalies.sort_by(|a, b| (a.ticket_id.as_str(), a.index).cmp(&(b.ticket_id.as_str(), b.index)));

  if anomalies.is_empty() {
    return Ok((Vec::new(), HashMap::new()));
  }

  let descriptions: Vec<String> = anomalies.iter().map(|a| a.description.clone()).collect();
  let embeddings = with_backoff(max_retries, || llm.embed_many(&descriptions)).await?;

  let clusters = greedy_cluster(&embeddings, cluster_threshold);

  let mut drafts = Vec::with_capacity(clusters.len());
  let mut anomaly_to_phenomenon = HashMap::new();

  for (phenom_idx, Cluster { centroid, member_indices }) in clusters.into_iter().enumerate() {
    let members: Vec<&raw_anomaly::Model> = member_indices.iter().map(|&i| &anomalies[i]).collect();

    let description = if members.len() == 1 {
      members[0].description.clone()
    } else {
      let joined: String = members
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {}", i + 1, m.description))
        .collect::<Vec<_>>()
        .join("\n");
      llm_chat(llm, max_retries, MERGE_SYSTEM_PROMPT, joined).await?
    };

    let observation_method = members
      .iter()
      .map(|m| m.observation_method.as_str())
      .filter(|s| !s.is_empty())
      .max_by_key(|s| s.chars().count())
      .unwrap_or_default()
      .to_owned();

    let source_anomaly_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();

    for id in &source_anomaly_ids {
      anomaly_to_phenomenon.insert(id.clone(), phenom_idx);
    }

    drafts.push(PhenomenonDraft {
      description,
      observation_method,
      cluster_size: source_anomaly_ids.len() as i32,
      source_anomaly_ids,
      embedding: centroid,
    });
  }

  Ok((drafts, anomaly_to_phenomenon))
}

async fn build_root_causes<L: Llm>(
  llm: &L,
  max_retries: u32,
  cluster_threshold: f32,
  db: &DatabaseConnection,
) -> Result<Vec<RootCauseDraft>, AppError> {
  let mut tickets = knowledge_store::all_raw_tickets(db).await?;
  tickets.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));

  if tickets.is_empty() {
    return Ok(Vec::new());
  }

  // Deduplicate root_cause_text by exact match, preserving first-seen order
  // under the ticket_id sort above for determinism.
  let mut order: Vec<String> = Vec::new();
  let mut ticket_counts: HashMap<String, i32> = HashMap::new();
  for t in &tickets {
    let counter = ticket_counts.entry(t.root_cause_text.clone()).or_insert(0);
    if *counter == 0 {
      order.push(t.root_cause_text.clone());
    }
    *counter += 1;
  }

  let solutions_by_text: HashMap<String, String> = tickets
    .iter()
    .map(|t| (t.root_cause_text.clone(), t.solution.clone()))
    .collect();

  let embeddings = with_backoff(max_retries, || llm.embed_many(&order)).await?;
  let clusters = greedy_cluster(&embeddings, cluster_threshold);

  let mut drafts = Vec::with_capacity(clusters.len());

  for Cluster { centroid, member_indices } in clusters {
    let texts: Vec<&String> = member_indices.iter().map(|&i| &order[i]).collect();

    let description = if texts.len() == 1 {
      texts[0].clone()
    } else {
      let joined: String = texts
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n");
      llm_chat(llm, max_retries, MERGE_SYSTEM_PROMPT, joined).await?
    };

    let solution = if texts.len() == 1 {
      solutions_by_text.get(texts[0]).cloned().unwrap_or_default()
    } else {
      let joined: String = texts
        .iter()
        .enumerate()
        .filter_map(|(i, t)| solutions_by_text.get(*t).map(|s| format!("{}. {}", i + 1, s)))
        .collect::<Vec<_>>()
        .join("\n");
      llm_chat(llm, max_retries, MERGE_SOLUTION_SYSTEM_PROMPT, joined).await?
    };

    let ticket_count: i32 = texts.iter().map(|t| ticket_counts[*t]).sum();
    let source_raw_root_cause_ids: Vec<String> = texts.iter().map(|t| (*t).clone()).collect();

    drafts.push(RootCauseDraft {
      description,
      solution,
      cluster_size: member_indices.len() as i32,
      ticket_count,
      embedding: centroid,
      source_texts: source_raw_root_cause_ids.clone(),
      source_raw_root_cause_ids,
    });
  }

  Ok(drafts)
}

/// Run the full offline pipeline: rebuild `phenomenon`, `root_cause`,
/// `ticket`, `ticket_phenomenon`, and `phenomenon_root_cause` from the raw
/// tables. Destructive and idempotent: running it twice without raw-data or
/// embedding changes reproduces the same standardized tables.
pub async fn rebuild_index<L: Llm>(
  llm: &L,
  max_retries: u32,
  cluster_threshold: f32,
  db: &DatabaseConnection,
) -> Result<RebuildReport, AppError> {
  let (phenomena, anomaly_to_phenomenon) = build_phenomena(llm, max_retries, cluster_threshold, db).await?;
  let root_causes = build_root_causes(llm, max_retries, cluster_threshold, db).await?;
  let raw_anomalies = knowledge_store::all_raw_anomalies(db).await?;
  let raw_tickets = knowledge_store::all_raw_tickets(db).await?;

  let phenomenon_ids: Vec<String> = (1..=phenomena.len()).map(|n| format!("P-{n:04}")).collect();
  let root_cause_ids: Vec<String> = (1..=root_causes.len()).map(|n| format!("RC-{n:04}")).collect();

  let root_cause_id_by_text: HashMap<&str, &str> = root_causes
    .iter()
    .zip(root_cause_ids.iter())
    .flat_map(|(rc, id)| rc.source_texts.iter().map(move |t| (t.as_str(), id.as_str())))
    .collect();

  let raw_anomaly_by_id: HashMap<&str, &raw_anomaly::Model> =
    raw_anomalies.iter().map(|a| (a.id.as_str(), a)).collect();

  let txn = db.begin().await?;
  txn
    .execute_raw(Statement::from_string(
      DatabaseBackend::Postgres,
      "SELECT pg_advisory_xact_lock(727478233);",
    ))
    .await?;

  ticket_phenomenon::Entity::delete_many().exec(&txn).await?;
  phenomenon_root_cause::Entity::delete_many().exec(&txn).await?;
  ticket::Entity::delete_many().exec(&txn).await?;
  phenomenon::Entity::delete_many().exec(&txn).await?;
  root_cause::Entity::delete_many().exec(&txn).await?;

  for (draft, id) in root_causes.iter().zip(root_cause_ids.iter()) {
    let model = root_cause::Model {
      id: id.clone(),
      description: draft.description.clone(),
      solution: draft.solution.clone(),
      source_raw_root_cause_ids: serde_json::to_value(&draft.source_raw_root_cause_ids)?,
      cluster_size: draft.cluster_size,
      ticket_count: draft.ticket_count,
      embedding: PgVector::from(draft.embedding.clone()),
    };
    model.into_active_model().insert(&txn).await?;
  }

  for (draft, id) in phenomena.iter().zip(phenomenon_ids.iter()) {
    let model = phenomenon::Model {
      id: id.clone(),
      description: draft.description.clone(),
      observation_method: draft.observation_method.clone(),
      source_anomaly_ids: serde_json::to_value(&draft.source_anomaly_ids)?,
      cluster_size: draft.cluster_size,
      embedding: PgVector::from(draft.embedding.clone()),
    };
    model.into_active_model().insert(&txn).await?;
  }

  // Resolve each raw ticket to its root cause and (re)write the `ticket` table.
  for t in &raw_tickets {
    let Some(&rc_id) = root_cause_id_by_text.get(t.root_cause_text.as_str()) else {
      continue;
    };
    let model = ticket::Model {
      ticket_id: t.ticket_id.clone(),
      description: t.description.clone(),
      root_cause_id: rc_id.to_owned(),
      solution: t.solution.clone(),
    };
    model.into_active_model().insert(&txn).await?;
  }

  // TicketPhenomenon: one row per raw anomaly, pointing at its assigned phenomenon.
  let mut link_count = 0usize;
  for (anomaly_id, &phenom_idx) in &anomaly_to_phenomenon {
    let Some(anomaly) = raw_anomaly_by_id.get(anomaly_id.as_str()) else { continue };
    let link = ticket_phenomenon::ActiveModel {
      id: Default::default(),
      ticket_id: sea_orm::ActiveValue::Set(anomaly.ticket_id.clone()),
      phenomenon_id: sea_orm::ActiveValue::Set(phenomenon_ids[phenom_idx].clone()),
      raw_anomaly_id: sea_orm::ActiveValue::Set(anomaly.id.clone()),
      why_relevant: sea_orm::ActiveValue::Set(anomaly.why_relevant.clone()),
    };
    link.insert(&txn).await?;
    link_count += 1;
  }

  // PhenomenonRootCause: one row per (phenomenon, root_cause) pair observed
  // together in some ticket, with ticket_count = number of such tickets.
  let ticket_root_cause: HashMap<&str, &str> = raw_tickets
    .iter()
    .filter_map(|t| root_cause_id_by_text.get(t.root_cause_text.as_str()).map(|rc| (t.ticket_id.as_str(), *rc)))
    .collect();

  let mut pair_tickets: HashMap<(String, String), std::collections::HashSet<String>> = HashMap::new();
  for (anomaly_id, &phenom_idx) in &anomaly_to_phenomenon {
    let Some(anomaly) = raw_anomaly_by_id.get(anomaly_id.as_str()) else { continue };
    let Some(&rc_id) = ticket_root_cause.get(anomaly.ticket_id.as_str()) else { continue };
    pair_tickets
      .entry((phenomenon_ids[phenom_idx].clone(), rc_id.to_owned()))
      .or_default()
      .insert(anomaly.ticket_id.clone());
  }

  let mut pairs: Vec<_> = pair_tickets.into_iter().collect();
  pairs.sort_by(|a, b| a.0.cmp(&b.0));
  let pair_count = pairs.len();

  for ((phenomenon_id, root_cause_id), tickets) in pairs {
    let link = phenomenon_root_cause::ActiveModel {
      id: Default::default(),
      phenomenon_id: sea_orm::ActiveValue::Set(phenomenon_id),
      root_cause_id: sea_orm::ActiveValue::Set(root_cause_id),
      ticket_count: sea_orm::ActiveValue::Set(tickets.len() as i32),
    };
    link.insert(&txn).await?;
  }

  txn.commit().await?;

  Ok(RebuildReport {
    phenomena: phenomena.len(),
    root_causes: root_causes.len(),
    ticket_phenomenon_links: link_count,
    phenomenon_root_cause_links: pair_count,
  })
}
