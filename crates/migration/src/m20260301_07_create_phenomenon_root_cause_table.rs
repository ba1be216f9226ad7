use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::{integer, pk_auto, string};

use super::m20260301_03_create_phenomenon_table::Phenomenon;
use super::m20260301_04_create_root_cause_table::RootCause;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(PhenomenonRootCause::Table)
          .if_not_exists()
          .col(pk_auto(PhenomenonRootCause::Id))
          .col(string(PhenomenonRootCause::PhenomenonId).not_null())
          .col(string(PhenomenonRootCause::RootCauseId).not_null())
          .col(integer(PhenomenonRootCause::TicketCount).not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_phenomenon_root_cause_phenomenon")
              .from(PhenomenonRootCause::Table, PhenomenonRootCause::PhenomenonId)
              .to(Phenomenon::Table, Phenomenon::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_phenomenon_root_cause_root_cause")
              .from(PhenomenonRootCause::Table, PhenomenonRootCause::RootCauseId)
              .to(RootCause::Table, RootCause::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_phenomenon_root_cause_unique")
          .table(PhenomenonRootCause::Table)
          .col(PhenomenonRootCause::PhenomenonId)
          .col(PhenomenonRootCause::RootCauseId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(PhenomenonRootCause::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum PhenomenonRootCause {
  Table,
  Id,
  PhenomenonId,
  RootCauseId,
  TicketCount,
}
