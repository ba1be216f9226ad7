use sea_orm_migration::{
  prelude::*,
  schema::{json_binary, string, text, timestamp_with_time_zone},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(RawTicket::Table)
          .if_not_exists()
          .col(string(RawTicket::TicketId).primary_key())
          .col(text(RawTicket::Description).not_null())
          .col(text(RawTicket::RootCauseText).not_null())
          .col(text(RawTicket::Solution).not_null())
          .col(json_binary(RawTicket::Metadata))
          .col(timestamp_with_time_zone(RawTicket::CreatedAt).not_null().default(Expr::current_timestamp()))
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(RawTicket::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum RawTicket {
  Table,
  TicketId,
  Description,
  RootCauseText,
  Solution,
  Metadata,
  CreatedAt,
}
