use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per anomaly extracted from a `raw_ticket` description at import time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "raw_anomaly")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub ticket_id: String,
  pub index: i32,
  pub description: String,
  pub observation_method: String,
  pub why_relevant: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::raw_ticket::Entity",
    from = "Column::TicketId",
    to = "super::raw_ticket::Column::TicketId"
  )]
  RawTicket,
}

impl Related<super::raw_ticket::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RawTicket.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
