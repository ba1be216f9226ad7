use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The standardized view of a ticket after index build: its raw row plus the
/// root cause it was assigned to.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub ticket_id: String,
  pub description: String,
  pub root_cause_id: String,
  pub solution: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::raw_ticket::Entity",
    from = "Column::TicketId",
    to = "super::raw_ticket::Column::TicketId"
  )]
  RawTicket,
  #[sea_orm(
    belongs_to = "super::root_cause::Entity",
    from = "Column::RootCauseId",
    to = "super::root_cause::Column::Id"
  )]
  RootCause,
  #[sea_orm(has_many = "super::ticket_phenomenon::Entity")]
  TicketPhenomenon,
}

impl Related<super::raw_ticket::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RawTicket.def()
  }
}

impl Related<super::root_cause::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RootCause.def()
  }
}

impl Related<super::ticket_phenomenon::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::TicketPhenomenon.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
