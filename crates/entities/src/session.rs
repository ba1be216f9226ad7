use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted dialogue session state. `blob` holds the serialized hypothesis
/// tracker and turn history. Concurrent turns on the same session are
/// serialized by taking `SELECT ... FOR UPDATE` on this row for the whole
/// turn (see `session::run_turn`), not by a separate fencing column.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub session_id: String,
  pub blob: Json,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
