use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::{integer, string, text};

use super::m20260301_01_create_raw_ticket_table::RawTicket;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(RawAnomaly::Table)
          .if_not_exists()
          .col(string(RawAnomaly::Id).primary_key())
          .col(string(RawAnomaly::TicketId).not_null())
          .col(integer(RawAnomaly::Index).not_null())
          .col(text(RawAnomaly::Description).not_null())
          .col(text(RawAnomaly::ObservationMethod).not_null())
          .col(text(RawAnomaly::WhyRelevant).not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_raw_anomaly_ticket")
              .from(RawAnomaly::Table, RawAnomaly::TicketId)
              .to(RawTicket::Table, RawTicket::TicketId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_raw_anomaly_ticket_index")
          .table(RawAnomaly::Table)
          .col(RawAnomaly::TicketId)
          .col(RawAnomaly::Index)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(RawAnomaly::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum RawAnomaly {
  Table,
  Id,
  TicketId,
  Index,
  Description,
  ObservationMethod,
  WhyRelevant,
}
