use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
  cli::run_cli(dbdiag_migration::Migrator).await
}
