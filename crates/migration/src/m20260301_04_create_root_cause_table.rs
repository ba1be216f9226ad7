use sea_orm_migration::{
  prelude::*,
  sea_orm::Statement,
  schema::{custom, integer, json_binary, string, text},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(RootCause::Table)
          .if_not_exists()
          .col(string(RootCause::Id).primary_key())
          .col(text(RootCause::Description).not_null())
          .col(text(RootCause::Solution).not_null())
          .col(json_binary(RootCause::SourceRawRootCauseIds))
          .col(integer(RootCause::ClusterSize).not_null())
          .col(integer(RootCause::TicketCount).not_null())
          .col(custom(RootCause::Embedding, "vector(1024)").not_null())
          .to_owned(),
      )
      .await?;

    manager
      .get_connection()
      .execute_raw(Statement::from_string(
        manager.get_database_backend(),
        "CREATE INDEX idx_root_cause_embedding ON root_cause USING hnsw (embedding vector_cosine_ops);",
      ))
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(RootCause::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum RootCause {
  Table,
  Id,
  Description,
  Solution,
  SourceRawRootCauseIds,
  ClusterSize,
  TicketCount,
  Embedding,
}
