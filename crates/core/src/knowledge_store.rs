//! Raw-table import and read accessors over the standardized knowledge
//! graph. Raw tables are append-only; standardized tables are written only
//! by the index builder.

use dbdiag_entities::{phenomenon, phenomenon_root_cause, raw_anomaly, raw_ticket, root_cause, ticket, ticket_phenomenon};
use dbdiag_shared::AppError;
use sea_orm::{
  ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, TransactionTrait,
  sea_query::OnConflict,
};
use serde::Deserialize;

/// One ticket as it appears in the import JSON array.
#[derive(Debug, Deserialize)]
pub struct TicketImport {
  pub ticket_id: String,
  #[serde(default)]
  pub metadata: serde_json::Value,
  pub description: String,
  pub root_cause: String,
  pub solution: String,
  #[serde(default)]
  pub anomalies: Vec<AnomalyImport>,
}

#[derive(Debug, Deserialize)]
pub struct AnomalyImport {
  pub description: String,
  pub observation_method: String,
  pub why_relevant: String,
}

/// Append rows to `raw_ticket`/`raw_anomaly`. Existing tickets with the same
/// id are left untouched (the import command only appends).
pub async fn import_tickets(
  tickets: Vec<TicketImport>,
  db: &DatabaseConnection,
) -> Result<usize, AppError> {
  if tickets.is_empty() {
    return Ok(0);
  }

  let txn = db.begin().await?;
  let mut imported = 0usize;

  for t in tickets {
    let model = raw_ticket::Model {
      ticket_id: t.ticket_id.clone(),
      description: t.description,
      root_cause_text: t.root_cause,
      solution: t.solution,
      metadata: t.metadata,
      created_at: chrono::Utc::now().into(),
    };

    let rows_affected = raw_ticket::Entity::insert(model.into_active_model())
      .on_conflict(OnConflict::column(raw_ticket::Column::TicketId).do_nothing().to_owned())
      .exec_without_returning(&txn)
      .await?;

    if rows_affected == 0 {
      continue;
    }
    imported += 1;

    for (i, a) in t.anomalies.into_iter().enumerate() {
      let anomaly = raw_anomaly::Model {
        id: format!("{}_anomaly_{i}", t.ticket_id),
        ticket_id: t.ticket_id.clone(),
        index: i as i32,
        description: a.description,
        observation_method: a.observation_method,
        why_relevant: a.why_relevant,
      };
      raw_anomaly::Entity::insert(anomaly.into_active_model())
        .on_conflict(OnConflict::column(raw_anomaly::Column::Id).do_nothing().to_owned())
        .exec_without_returning(&txn)
        .await?;
    }
  }

  txn.commit().await?;
  Ok(imported)
}

/// All raw anomalies, for index-build consumption. Callers sort by
/// `(ticket_id, index)` themselves to keep the clustering order explicit.
pub async fn all_raw_anomalies(db: &DatabaseConnection) -> Result<Vec<raw_anomaly::Model>, AppError> {
  Ok(raw_anomaly::Entity::find().all(db).await?)
}

pub async fn all_raw_tickets(db: &DatabaseConnection) -> Result<Vec<raw_ticket::Model>, AppError> {
  Ok(raw_ticket::Entity::find().all(db).await?)
}

pub async fn all_phenomena(db: &DatabaseConnection) -> Result<Vec<phenomenon::Model>, AppError> {
  Ok(phenomenon::Entity::find().all(db).await?)
}

pub async fn all_root_causes(db: &DatabaseConnection) -> Result<Vec<root_cause::Model>, AppError> {
  Ok(root_cause::Entity::find().all(db).await?)
}

pub async fn phenomenon_by_id(
  id: &str,
  db: &DatabaseConnection,
) -> Result<Option<phenomenon::Model>, AppError> {
  Ok(phenomenon::Entity::find_by_id(id.to_owned()).one(db).await?)
}

pub async fn root_cause_by_id(
  id: &str,
  db: &DatabaseConnection,
) -> Result<Option<root_cause::Model>, AppError> {
  Ok(root_cause::Entity::find_by_id(id.to_owned()).one(db).await?)
}

/// Root causes associated (via `PhenomenonRootCause`) with any phenomenon in
/// `phenomenon_ids`. A missing row means no association — never an error.
pub async fn root_causes_for_phenomena(
  phenomenon_ids: &[String],
  db: &DatabaseConnection,
) -> Result<Vec<phenomenon_root_cause::Model>, AppError> {
  if phenomenon_ids.is_empty() {
    return Ok(Vec::new());
  }
  Ok(
    phenomenon_root_cause::Entity::find()
      .filter(phenomenon_root_cause::Column::PhenomenonId.is_in(phenomenon_ids.to_vec()))
      .all(db)
      .await?,
  )
}

/// `PhenomenonRootCause` rows for a specific root cause, i.e. `R_p` from the
/// hypothesis-confidence formula.
pub async fn phenomena_for_root_cause(
  root_cause_id: &str,
  db: &DatabaseConnection,
) -> Result<Vec<phenomenon_root_cause::Model>, AppError> {
  Ok(
    phenomenon_root_cause::Entity::find()
      .filter(phenomenon_root_cause::Column::RootCauseId.eq(root_cause_id.to_owned()))
      .all(db)
      .await?,
  )
}

pub async fn max_ticket_count(db: &DatabaseConnection) -> Result<i32, AppError> {
  use sea_orm::QueryOrder;
  let row = phenomenon_root_cause::Entity::find()
    .order_by_desc(phenomenon_root_cause::Column::TicketCount)
    .one(db)
    .await?;
  Ok(row.map_or(1, |r| r.ticket_count.max(1)))
}

/// Union of phenomena associated with any of `ticket_ids`, deduplicated.
pub async fn phenomena_by_ticket_ids(
  ticket_ids: &[String],
  db: &DatabaseConnection,
) -> Result<Vec<phenomenon::Model>, AppError> {
  if ticket_ids.is_empty() {
    return Ok(Vec::new());
  }

  let links = ticket_phenomenon::Entity::find()
    .filter(ticket_phenomenon::Column::TicketId.is_in(ticket_ids.to_vec()))
    .all(db)
    .await?;

  let mut seen = std::collections::HashSet::new();
  let mut ids = Vec::new();
  for link in links {
    if seen.insert(link.phenomenon_id.clone()) {
      ids.push(link.phenomenon_id);
    }
  }

  if ids.is_empty() {
    return Ok(Vec::new());
  }

  Ok(
    phenomenon::Entity::find()
      .filter(phenomenon::Column::Id.is_in(ids))
      .all(db)
      .await?,
  )
}

/// Tickets in which `phenomenon_id` co-occurred with `root_cause_id`.
pub async fn supporting_tickets(
  phenomenon_id: &str,
  root_cause_id: &str,
  db: &DatabaseConnection,
) -> Result<Vec<String>, AppError> {
  let links = ticket_phenomenon::Entity::find()
    .filter(ticket_phenomenon::Column::PhenomenonId.eq(phenomenon_id.to_owned()))
    .all(db)
    .await?;

  if links.is_empty() {
    return Ok(Vec::new());
  }

  let ticket_ids: Vec<String> = links.into_iter().map(|l| l.ticket_id).collect();
  let tickets = ticket::Entity::find()
    .filter(ticket::Column::TicketId.is_in(ticket_ids))
    .filter(ticket::Column::RootCauseId.eq(root_cause_id.to_owned()))
    .all(db)
    .await?;

  Ok(tickets.into_iter().map(|t| t.ticket_id).collect())
}
