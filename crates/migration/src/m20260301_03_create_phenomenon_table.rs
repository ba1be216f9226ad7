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
          .table(Phenomenon::Table)
          .if_not_exists()
          .col(string(Phenomenon::Id).primary_key())
          .col(text(Phenomenon::Description).not_null())
          .col(text(Phenomenon::ObservationMethod).not_null())
          .col(json_binary(Phenomenon::SourceAnomalyIds))
          .col(integer(Phenomenon::ClusterSize).not_null())
          .col(custom(Phenomenon::Embedding, "vector(1024)").not_null())
          .to_owned(),
      )
      .await?;

    manager
      .get_connection()
      .execute_raw(Statement::from_string(
        manager.get_database_backend(),
        "CREATE INDEX idx_phenomenon_embedding ON phenomenon USING hnsw (embedding vector_cosine_ops);",
      ))
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Phenomenon::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Phenomenon {
  Table,
  Id,
  Description,
  ObservationMethod,
  SourceAnomalyIds,
  ClusterSize,
  Embedding,
}
