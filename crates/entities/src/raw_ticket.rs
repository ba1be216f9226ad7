use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per imported incident ticket, as submitted. Append-only.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "raw_ticket")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub ticket_id: String,
  pub description: String,
  pub root_cause_text: String,
  pub solution: String,
  pub metadata: Json,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::raw_anomaly::Entity")]
  RawAnomaly,
}

impl Related<super::raw_anomaly::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RawAnomaly.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
