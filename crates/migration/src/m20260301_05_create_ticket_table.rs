use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::{string, text};

use super::m20260301_01_create_raw_ticket_table::RawTicket;
use super::m20260301_04_create_root_cause_table::RootCause;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Ticket::Table)
          .if_not_exists()
          .col(string(Ticket::TicketId).primary_key())
          .col(text(Ticket::Description).not_null())
          .col(string(Ticket::RootCauseId).not_null())
          .col(text(Ticket::Solution).not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_ticket_raw_ticket")
              .from(Ticket::Table, Ticket::TicketId)
              .to(RawTicket::Table, RawTicket::TicketId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_ticket_root_cause")
              .from(Ticket::Table, Ticket::RootCauseId)
              .to(RootCause::Table, RootCause::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Ticket::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Ticket {
  Table,
  TicketId,
  Description,
  RootCauseId,
  Solution,
}
