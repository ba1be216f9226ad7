pub use sea_orm_migration::*;

mod m20260301_01_create_raw_ticket_table;
mod m20260301_02_create_raw_anomaly_table;
mod m20260301_03_create_phenomenon_table;
mod m20260301_04_create_root_cause_table;
mod m20260301_05_create_ticket_table;
mod m20260301_06_create_ticket_phenomenon_table;
mod m20260301_07_create_phenomenon_root_cause_table;
mod m20260301_08_create_session_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260301_01_create_raw_ticket_table::Migration),
      Box::new(m20260301_02_create_raw_anomaly_table::Migration),
      Box::new(m20260301_03_create_phenomenon_table::Migration),
      Box::new(m20260301_04_create_root_cause_table::Migration),
      Box::new(m20260301_05_create_ticket_table::Migration),
      Box::new(m20260301_06_create_ticket_phenomenon_table::Migration),
      Box::new(m20260301_07_create_phenomenon_root_cause_table::Migration),
      Box::new(m20260301_08_create_session_table::Migration),
    ]
  }
}
