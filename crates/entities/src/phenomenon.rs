use sea_orm::entity::prelude::*;
use sea_orm::prelude::PgVector;
use serde::{Deserialize, Serialize};

/// A canonicalized phenomenon node. Entirely rebuilt on each index rebuild;
/// `id` is reassigned in lexicographic cluster order so rebuilds are
/// reproducible given the same raw tables.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phenomenon")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub description: String,
  pub observation_method: String,
  pub source_anomaly_ids: Json,
  pub cluster_size: i32,
  #[sea_orm(column_type = "custom(\"vector\")")]
  pub embedding: PgVector,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::ticket_phenomenon::Entity")]
  TicketPhenomenon,
  #[sea_orm(has_many = "super::phenomenon_root_cause::Entity")]
  PhenomenonRootCause,
}

impl Related<super::ticket_phenomenon::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::TicketPhenomenon.def()
  }
}

impl Related<super::phenomenon_root_cause::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::PhenomenonRootCause.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
