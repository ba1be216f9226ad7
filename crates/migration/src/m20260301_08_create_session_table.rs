use sea_orm_migration::{
  prelude::*,
  schema::{json_binary, string, timestamp_with_time_zone},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Session::Table)
          .if_not_exists()
          .col(string(Session::SessionId).primary_key())
          .col(json_binary(Session::Blob))
          .col(timestamp_with_time_zone(Session::CreatedAt).not_null().default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Session::UpdatedAt).not_null().default(Expr::current_timestamp()))
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Session::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Session {
  Table,
  SessionId,
  Blob,
  CreatedAt,
  UpdatedAt,
}
