use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Edge of the phenomenon/root-cause graph: how many tickets co-occurred a
/// phenomenon with a root cause. Feeds the hypothesis confidence formula.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phenomenon_root_cause")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub phenomenon_id: String,
  pub root_cause_id: String,
  pub ticket_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::phenomenon::Entity",
    from = "Column::PhenomenonId",
    to = "super::phenomenon::Column::Id"
  )]
  Phenomenon,
  #[sea_orm(
    belongs_to = "super::root_cause::Entity",
    from = "Column::RootCauseId",
    to = "super::root_cause::Column::Id"
  )]
  RootCause,
}

impl Related<super::phenomenon::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Phenomenon.def()
  }
}

impl Related<super::root_cause::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RootCause.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
