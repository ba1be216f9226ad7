use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Association between a ticket and a phenomenon it exhibited, traced back to
/// the raw anomaly that justified the link.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket_phenomenon")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub ticket_id: String,
  pub phenomenon_id: String,
  pub raw_anomaly_id: String,
  pub why_relevant: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::ticket::Entity",
    from = "Column::TicketId",
    to = "super::ticket::Column::TicketId"
  )]
  Ticket,
  #[sea_orm(
    belongs_to = "super::phenomenon::Entity",
    from = "Column::PhenomenonId",
    to = "super::phenomenon::Column::Id"
  )]
  Phenomenon,
  #[sea_orm(
    belongs_to = "super::raw_anomaly::Entity",
    from = "Column::RawAnomalyId",
    to = "super::raw_anomaly::Column::Id"
  )]
  RawAnomaly,
}

impl Related<super::ticket::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Ticket.def()
  }
}

impl Related<super::phenomenon::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Phenomenon.def()
  }
}

impl Related<super::raw_anomaly::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RawAnomaly.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
