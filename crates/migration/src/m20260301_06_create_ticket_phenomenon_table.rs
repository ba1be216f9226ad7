use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::{pk_auto, string, text};

use super::m20260301_02_create_raw_anomaly_table::RawAnomaly;
use super::m20260301_03_create_phenomenon_table::Phenomenon;
use super::m20260301_05_create_ticket_table::Ticket;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(TicketPhenomenon::Table)
          .if_not_exists()
          .col(pk_auto(TicketPhenomenon::Id))
          .col(string(TicketPhenomenon::TicketId).not_null())
          .col(string(TicketPhenomenon::PhenomenonId).not_null())
          .col(string(TicketPhenomenon::RawAnomalyId).not_null())
          .col(text(TicketPhenomenon::WhyRelevant).not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_ticket_phenomenon_ticket")
              .from(TicketPhenomenon::Table, TicketPhenomenon::TicketId)
              .to(Ticket::Table, Ticket::TicketId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_ticket_phenomenon_phenomenon")
              .from(TicketPhenomenon::Table, TicketPhenomenon::PhenomenonId)
              .to(Phenomenon::Table, Phenomenon::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_ticket_phenomenon_raw_anomaly")
              .from(TicketPhenomenon::Table, TicketPhenomenon::RawAnomalyId)
              .to(RawAnomaly::Table, RawAnomaly::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_ticket_phenomenon_unique")
          .table(TicketPhenomenon::Table)
          .col(TicketPhenomenon::TicketId)
          .col(TicketPhenomenon::PhenomenonId)
          .col(TicketPhenomenon::RawAnomalyId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(TicketPhenomenon::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum TicketPhenomenon {
  Table,
  Id,
  TicketId,
  PhenomenonId,
  RawAnomalyId,
  WhyRelevant,
}
