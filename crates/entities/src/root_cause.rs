use sea_orm::entity::prelude::*;
use sea_orm::prelude::PgVector;
use serde::{Deserialize, Serialize};

/// A canonicalized root cause node. Entirely rebuilt on each index rebuild.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "root_cause")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub description: String,
  pub solution: String,
  pub source_raw_root_cause_ids: Json,
  pub cluster_size: i32,
  pub ticket_count: i32,
  #[sea_orm(column_type = "custom(\"vector\")")]
  pub embedding: PgVector,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::ticket::Entity")]
  Ticket,
  #[sea_orm(has_many = "super::phenomenon_root_cause::Entity")]
  PhenomenonRootCause,
}

impl Related<super::ticket::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Ticket.def()
  }
}

impl Related<super::phenomenon_root_cause::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::PhenomenonRootCause.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
